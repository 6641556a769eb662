// component.rs
// Electrodes of the tube: type tag, placement, bias and shape, plus the set that owns them

use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

use crate::error::{PmtError, Result};
use crate::geometry::Shape;
use crate::sey::YieldModel;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Fotocathode,
    Anode,
    Dinode,
    Grid,
    Accelerator,
    Custom,
}

impl ComponentKind {
    /// Roles that exist at most once and can't be deleted.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            ComponentKind::Fotocathode
                | ComponentKind::Anode
                | ComponentKind::Grid
                | ComponentKind::Accelerator
        )
    }

    /// Electrodes that swallow electrons without multiplying them.
    pub fn is_absorber(self) -> bool {
        matches!(
            self,
            ComponentKind::Grid | ComponentKind::Accelerator | ComponentKind::Custom
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub kind: ComponentKind,
    /// Centre of a `Rect` electrode. `Bounds` and `Polygon` outlines are absolute and ignore it.
    pub position: DVec2,
    /// Bias in volts
    pub voltage: f64,
    pub shape: Shape,
    /// Only read for dinodes
    pub yield_model: YieldModel,
    /// Probability that an electron passes a grid/accelerator in the interactive engine
    pub transmission: f64,
}

impl Component {
    pub fn new(kind: ComponentKind, position: DVec2, voltage: f64) -> Self {
        Self {
            kind,
            position,
            voltage,
            shape: Shape::default(),
            yield_model: YieldModel::default(),
            transmission: 0.0,
        }
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_yield_model(mut self, model: YieldModel) -> Self {
        self.yield_model = model;
        self
    }

    pub fn with_transmission(mut self, transmission: f64) -> Self {
        self.transmission = transmission.clamp(0.0, 1.0);
        self
    }

    pub fn contains(&self, p: DVec2) -> bool {
        self.shape.contains(self.position, p)
    }

    pub fn outline(&self) -> Vec<DVec2> {
        self.shape.outline(self.position)
    }

    /// Where the field model places this electrode's point charge.
    pub fn charge_position(&self) -> DVec2 {
        self.shape.centroid(self.position)
    }
}

/// Electrode as seen by the exact engine: geometry queried in millimetres.
pub trait Electrode: Sync {
    fn is_interior(&self, x_mm: f64, y_mm: f64) -> bool;
    /// Boundary in millimetres, drawing order.
    fn vertices_mm(&self) -> Vec<DVec2>;
    fn voltage(&self) -> f64;
    fn yield_model(&self) -> YieldModel {
        YieldModel::default()
    }
}

/// Components used with the exact engine store their geometry in millimetres.
impl Electrode for Component {
    fn is_interior(&self, x_mm: f64, y_mm: f64) -> bool {
        self.contains(DVec2::new(x_mm, y_mm))
    }

    fn vertices_mm(&self) -> Vec<DVec2> {
        self.outline()
    }

    fn voltage(&self) -> f64 {
        self.voltage
    }

    fn yield_model(&self) -> YieldModel {
        self.yield_model
    }
}

/// The tube's electrodes. Enforces the singleton roles on every edit.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComponentSet {
    components: Vec<Component>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: Vec<Component>) -> Result<Self> {
        let mut set = Self::new();
        for c in components {
            set.add(c)?;
        }
        Ok(set)
    }

    /// Add a component and return its index.
    pub fn add(&mut self, component: Component) -> Result<usize> {
        if component.kind.is_singleton() && self.components.iter().any(|c| c.kind == component.kind) {
            return Err(PmtError::DuplicateSingleton(component.kind));
        }
        self.components.push(component);
        Ok(self.components.len() - 1)
    }

    /// Remove a dinode or custom shape.
    pub fn remove(&mut self, index: usize) -> Result<Component> {
        let kind = self
            .components
            .get(index)
            .ok_or(PmtError::NoSuchComponent(index))?
            .kind;
        if kind.is_singleton() {
            return Err(PmtError::ProtectedComponent { index, kind });
        }
        Ok(self.components.remove(index))
    }

    pub fn set_voltage(&mut self, index: usize, voltage: f64) -> Result<()> {
        let c = self
            .components
            .get_mut(index)
            .ok_or(PmtError::NoSuchComponent(index))?;
        c.voltage = voltage;
        Ok(())
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    pub fn fotocathode(&self) -> Option<&Component> {
        self.of_kind(ComponentKind::Fotocathode).next()
    }

    pub fn anodes(&self) -> Vec<&Component> {
        self.of_kind(ComponentKind::Anode).collect()
    }

    /// Dinodes in index order.
    pub fn dinodes(&self) -> Vec<&Component> {
        self.of_kind(ComponentKind::Dinode).collect()
    }

    pub fn absorbers(&self) -> Vec<&Component> {
        self.components.iter().filter(|c| c.kind.is_absorber()).collect()
    }

    /// A straight tube: fotocathode at the origin, `dinodes` dinodes staggered about the
    /// axis every `spacing` units with voltage rising by `voltage_step`, anode at the end.
    pub fn linear_chain(dinodes: usize, spacing: f64, voltage_step: f64) -> Self {
        let half = spacing * 0.25;
        let mut components = Vec::with_capacity(dinodes + 2);
        components.push(
            Component::new(ComponentKind::Fotocathode, DVec2::zero(), -voltage_step)
                .with_shape(Shape::Rect { half_width: half }),
        );
        for i in 0..dinodes {
            let side = if i % 2 == 0 { 1.0 } else { -1.0 };
            let pos = DVec2::new((i + 1) as f64 * spacing, side * spacing * 0.5);
            components.push(
                Component::new(ComponentKind::Dinode, pos, (i + 1) as f64 * voltage_step)
                    .with_shape(Shape::Rect { half_width: half }),
            );
        }
        components.push(
            Component::new(
                ComponentKind::Anode,
                DVec2::new((dinodes + 1) as f64 * spacing, 0.0),
                (dinodes + 2) as f64 * voltage_step,
            )
            .with_shape(Shape::Rect { half_width: half }),
        );
        Self { components }
    }
}
