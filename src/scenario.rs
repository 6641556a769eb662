// scenario.rs
// Loads, validates and writes tube descriptions: engine settings plus the electrode list

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use ultraviolet::{DVec2, DVec3};

use crate::component::{Component, ComponentKind, ComponentSet};
use crate::config::{ExactConfig, InteractiveConfig, PulseConfig};
use crate::error::{PmtError, Result};
use crate::field::CoulombField;
use crate::geometry::Shape;
use crate::interactive::InteractiveSim;
use crate::sey::YieldModel;
use crate::units;

/// Electrode outline as written in a scenario file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeEntry {
    Rect { half_width: f64 },
    Bounds { x: f64, y: f64, w: f64, h: f64 },
    Polygon { vertices: Vec<[f64; 2]> },
}

impl From<&ShapeEntry> for Shape {
    fn from(entry: &ShapeEntry) -> Self {
        match entry {
            ShapeEntry::Rect { half_width } => Shape::Rect {
                half_width: *half_width,
            },
            ShapeEntry::Bounds { x, y, w, h } => Shape::Bounds {
                x: *x,
                y: *y,
                w: *w,
                h: *h,
            },
            ShapeEntry::Polygon { vertices } => Shape::Polygon {
                vertices: vertices.iter().map(|v| DVec2::new(v[0], v[1])).collect(),
            },
        }
    }
}

impl From<&Shape> for ShapeEntry {
    fn from(shape: &Shape) -> Self {
        match shape {
            Shape::Rect { half_width } => ShapeEntry::Rect {
                half_width: *half_width,
            },
            Shape::Bounds { x, y, w, h } => ShapeEntry::Bounds {
                x: *x,
                y: *y,
                w: *w,
                h: *h,
            },
            Shape::Polygon { vertices } => ShapeEntry::Polygon {
                vertices: vertices.iter().map(|v| [v.x, v.y]).collect(),
            },
        }
    }
}

/// One `[[components]]` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub kind: ComponentKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub voltage: f64,
    pub transmission: Option<f64>,
    /// Default square when omitted
    pub shape: Option<ShapeEntry>,
    pub yield_model: Option<YieldModel>,
}

impl ComponentEntry {
    fn check(&self, index: usize) -> Result<()> {
        let bad = |what: &str| {
            Err(PmtError::InvalidScenario(format!(
                "component {} ({:?}): {}",
                index, self.kind, what
            )))
        };
        if !(self.x.is_finite() && self.y.is_finite()) {
            return bad("position must be finite");
        }
        if !self.voltage.is_finite() {
            return bad("voltage must be finite");
        }
        match &self.shape {
            Some(ShapeEntry::Rect { half_width }) if !(*half_width > 0.0) => {
                return bad("half_width must be positive")
            }
            Some(ShapeEntry::Bounds { x, y, w, h })
                if ![*x, *y, *w, *h].iter().all(|v| v.is_finite()) || *w == 0.0 || *h == 0.0 =>
            {
                return bad("bounds must be finite with non-zero extent")
            }
            Some(ShapeEntry::Polygon { vertices }) if vertices.len() < 3 => {
                return bad("polygon needs at least three vertices")
            }
            Some(ShapeEntry::Polygon { vertices })
                if !vertices.iter().flatten().all(|v| v.is_finite()) =>
            {
                return bad("polygon vertices must be finite")
            }
            _ => {}
        }
        if let Some(model) = &self.yield_model {
            model.check().or_else(bad)?;
        }
        if let Some(t) = self.transmission {
            if !(0.0..=1.0).contains(&t) {
                return bad("transmission must lie in [0, 1]");
            }
        }
        Ok(())
    }

    pub fn to_component(&self) -> Component {
        let mut c = Component::new(self.kind, DVec2::new(self.x, self.y), self.voltage);
        if let Some(shape) = &self.shape {
            c = c.with_shape(shape.into());
        }
        if let Some(model) = self.yield_model {
            c = c.with_yield_model(model);
        }
        if let Some(t) = self.transmission {
            c = c.with_transmission(t);
        }
        c
    }
}

impl From<&Component> for ComponentEntry {
    fn from(c: &Component) -> Self {
        Self {
            kind: c.kind,
            x: c.position.x,
            y: c.position.y,
            voltage: c.voltage,
            transmission: c.kind.is_absorber().then_some(c.transmission),
            shape: Some((&c.shape).into()),
            yield_model: (c.kind == ComponentKind::Dinode).then_some(c.yield_model),
        }
    }
}

/// A complete tube description.
///
/// Component coordinates are millimetres for the exact engine and pixels for the interactive one;
/// the file itself is unit-agnostic.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: Option<String>,
    pub exact: ExactConfig,
    pub interactive: InteractiveConfig,
    pub pulse: PulseConfig,
    pub components: Vec<ComponentEntry>,
}

impl Scenario {
    /// Straight tube from [`ComponentSet::linear_chain`] with default engine settings.
    pub fn linear(dinodes: usize, spacing: f64, voltage_step: f64) -> Self {
        let set = ComponentSet::linear_chain(dinodes, spacing, voltage_step);
        Self {
            name: Some(format!("linear-{}", dinodes)),
            components: set.components().iter().map(ComponentEntry::from).collect(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let scenario = Self::from_toml_str(&content)?;
        info!(
            "loaded scenario {} from {} ({} components)",
            scenario.name.as_deref().unwrap_or("<unnamed>"),
            path.display(),
            scenario.components.len()
        );
        Ok(scenario)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Structural checks: one fotocathode, one anode, sane shapes and engine settings.
    pub fn validate(&self) -> Result<()> {
        for (i, c) in self.components.iter().enumerate() {
            c.check(i)?;
        }
        let count = |kind: ComponentKind| self.components.iter().filter(|c| c.kind == kind).count();
        if count(ComponentKind::Fotocathode) != 1 {
            return Err(PmtError::InvalidScenario(
                "scenario needs exactly one fotocathode".into(),
            ));
        }
        if count(ComponentKind::Anode) != 1 {
            return Err(PmtError::InvalidScenario(
                "scenario needs exactly one anode".into(),
            ));
        }
        self.exact
            .check()
            .and_then(|_| self.interactive.check())
            .and_then(|_| self.pulse.check())
            .map_err(|what| PmtError::InvalidScenario(what.into()))
    }

    pub fn components(&self) -> Vec<Component> {
        self.components.iter().map(ComponentEntry::to_component).collect()
    }

    pub fn component_set(&self) -> Result<ComponentSet> {
        ComponentSet::from_components(self.components())
    }

    /// SI field of the electrodes read as millimetre coordinates, plus the configured magnetic field.
    pub fn exact_field(&self, components: &[Component]) -> CoulombField {
        let b = self.exact.magnetic_field;
        CoulombField::millimetres(components, units::mm_to_m(self.exact.reference_radius_mm))
            .with_magnetic(DVec3::new(b[0], b[1], b[2]))
    }

    pub fn interactive_sim(&self, seed: u64) -> Result<InteractiveSim> {
        Ok(InteractiveSim::new(
            self.component_set()?,
            self.interactive.clone(),
            seed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sey::SternglassParams;

    const TUBE: &str = r#"
name = "bench"

[exact]
dt = 5e-12
max_depth = 12

[interactive]
drift_field = [-0.05, 0.0]

[pulse]
photons = 20
seed = 7

[[components]]
kind = "fotocathode"
x = 0.0
y = 0.0
voltage = -100.0
shape = { type = "rect", half_width = 2.0 }

[[components]]
kind = "dinode"
x = 10.0
y = 3.0
voltage = 100.0
yield_model = { model = "simple", r = 0.2, beta = 0.5 }

[[components]]
kind = "grid"
x = 5.0
y = 0.0
voltage = 0.0
transmission = 0.8
shape = { type = "polygon", vertices = [[4.0, -3.0], [6.0, -3.0], [6.0, 3.0], [4.0, 3.0]] }

[[components]]
kind = "anode"
x = 20.0
y = 0.0
voltage = 300.0
shape = { type = "bounds", x = 19.0, y = -5.0, w = 2.0, h = 10.0 }
"#;

    #[test]
    fn parses_components_and_settings() {
        let s = Scenario::from_toml_str(TUBE).unwrap();
        assert_eq!(s.name.as_deref(), Some("bench"));
        assert_eq!(s.exact.dt, 5e-12);
        assert_eq!(s.exact.max_depth, 12);
        assert_eq!(s.exact.max_steps, crate::config::MAX_STEPS_PER_PARTICLE);
        assert_eq!(s.interactive.drift_field, [-0.05, 0.0]);
        assert_eq!(s.pulse.photons, 20);

        let comps = s.components();
        assert_eq!(comps.len(), 4);
        assert_eq!(comps[0].shape, Shape::Rect { half_width: 2.0 });
        assert_eq!(comps[1].shape, Shape::default());
        assert_eq!(comps[1].yield_model, YieldModel::Simple { r: 0.2, beta: 0.5 });
        assert_eq!(comps[2].transmission, 0.8);
        assert!(comps[2].contains(DVec2::new(5.0, 0.0)));
        assert!(comps[3].contains(DVec2::new(20.0, 4.0)));
        assert_eq!(s.component_set().unwrap().dinodes().len(), 1);
    }

    #[test]
    fn written_scenario_reads_back() {
        let s = Scenario::linear(4, 10.0, 100.0);
        let text = s.to_toml().unwrap();
        let back = Scenario::from_toml_str(&text).unwrap();
        assert_eq!(back.components, s.components);
        assert_eq!(back.name, s.name);
        assert_eq!(back.component_set().unwrap().dinodes().len(), 4);
    }

    #[test]
    fn sternglass_parameters_default_per_field() {
        let text = TUBE.replace(
            r#"yield_model = { model = "simple", r = 0.2, beta = 0.5 }"#,
            r#"yield_model = { model = "sternglass", delta_max = 6.0 }"#,
        );
        let s = Scenario::from_toml_str(&text).unwrap();
        match s.components()[1].yield_model {
            YieldModel::Sternglass(p) => {
                assert_eq!(p.delta_max, 6.0);
                assert_eq!(p.e_max_ev, crate::config::SEY_E_MAX_EV);
            }
            other => panic!("unexpected model {:?}", other),
        }
    }

    #[test]
    fn missing_fotocathode_is_rejected() {
        let mut s = Scenario::linear(2, 10.0, 100.0);
        s.components.retain(|c| c.kind != ComponentKind::Fotocathode);
        assert!(matches!(s.validate(), Err(PmtError::InvalidScenario(_))));
    }

    #[test]
    fn second_anode_is_rejected() {
        let mut s = Scenario::linear(1, 10.0, 100.0);
        let anode = s.components.last().cloned().unwrap();
        s.components.push(anode);
        assert!(s.validate().is_err());
    }

    #[test]
    fn bad_shapes_and_settings_are_rejected() {
        let mut s = Scenario::linear(1, 10.0, 100.0);
        s.components[1].shape = Some(ShapeEntry::Polygon {
            vertices: vec![[0.0, 0.0], [1.0, 0.0]],
        });
        assert!(s.validate().is_err());

        let mut s = Scenario::linear(1, 10.0, 100.0);
        s.components[1].shape = Some(ShapeEntry::Rect { half_width: 0.0 });
        assert!(s.validate().is_err());

        let mut s = Scenario::linear(1, 10.0, 100.0);
        s.exact.dt = 0.0;
        assert!(s.validate().is_err());

        let mut s = Scenario::linear(1, 10.0, 100.0);
        s.interactive.quantum_efficiency = 1.5;
        assert!(s.validate().is_err());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let rejected = |f: &dyn Fn(&mut Scenario)| {
            let mut s = Scenario::linear(1, 10.0, 100.0);
            f(&mut s);
            matches!(s.validate(), Err(PmtError::InvalidScenario(_)))
        };
        assert!(rejected(&|s| {
            s.components[1].shape = Some(ShapeEntry::Polygon {
                vertices: vec![[0.0, 0.0], [f64::NAN, 1.0], [1.0, 0.0]],
            })
        }));
        assert!(rejected(&|s| {
            s.components[1].yield_model = Some(YieldModel::Sternglass(SternglassParams {
                jitter: f64::INFINITY,
                ..SternglassParams::default()
            }))
        }));
        assert!(rejected(&|s| {
            s.components[1].yield_model = Some(YieldModel::Simple {
                r: 0.1,
                beta: f64::NAN,
            })
        }));
        assert!(rejected(&|s| s.interactive.emission_spread = f64::INFINITY));
        assert!(rejected(&|s| s.interactive.drift_field = [0.0, f64::NEG_INFINITY]));
        assert!(rejected(&|s| s.exact.secondary_energy_ev = f64::NAN));
        assert!(rejected(&|s| s.exact.dt = f64::INFINITY));
        assert!(rejected(&|s| s.pulse.energy_ev = f64::NAN));
        assert!(!rejected(&|_| {}));
    }

    #[test]
    fn infinite_jitter_in_toml_is_rejected() {
        let text = TUBE.replace(
            r#"yield_model = { model = "simple", r = 0.2, beta = 0.5 }"#,
            r#"yield_model = { model = "sternglass", jitter = inf }"#,
        );
        assert!(matches!(
            Scenario::from_toml_str(&text),
            Err(PmtError::InvalidScenario(_))
        ));
    }

    #[test]
    fn malformed_toml_surfaces_parse_error() {
        assert!(matches!(
            Scenario::from_toml_str("components = 3"),
            Err(PmtError::TomlParse(_))
        ));
    }

    #[test]
    fn exact_field_uses_reference_radius() {
        let s = Scenario::from_toml_str(TUBE).unwrap();
        let comps = s.components();
        let field = s.exact_field(&comps);
        assert_eq!(field.k, units::mm_to_m(crate::config::FIELD_REFERENCE_RADIUS_MM));
        assert_eq!(field.magnetic, DVec3::zero());
    }

    #[test]
    fn bundled_scenarios_are_valid() {
        let linear = Scenario::from_toml_str(include_str!("../scenarios/linear.toml")).unwrap();
        assert_eq!(linear.component_set().unwrap().dinodes().len(), 4);
        let live = Scenario::from_toml_str(include_str!("../scenarios/interactive.toml")).unwrap();
        assert_eq!(live.interactive.max_particles, crate::config::MAX_PARTICLES);
    }

    #[test]
    fn interactive_sim_carries_settings() {
        let s = Scenario::from_toml_str(TUBE).unwrap();
        let sim = s.interactive_sim(1).unwrap();
        assert_eq!(sim.components.len(), 4);
        assert_eq!(sim.config.drift_field, [-0.05, 0.0]);
        assert!(!sim.is_running());
    }
}
