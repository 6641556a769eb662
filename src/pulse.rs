// pulse.rs
// A light pulse on the fotocathode: many independent cascades run in parallel, then summarised

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::Serialize;
use ultraviolet::{DVec2, DVec3};

use crate::cascade::{simulate_cascade, CascadeRequest, CascadeResult, Enclosure, TubeElectrodes, TubeVolume};
use crate::component::{Component, ComponentKind};
use crate::config::{ExactConfig, PulseConfig};
use crate::error::{PmtError, Result};
use crate::field::EmField;
use crate::profile_scope;
use crate::units::{self, ELECTRON_CHARGE, ELECTRON_MASS, ELEMENTARY_CHARGE};

/// A tube laid out in millimetres, ready for photoelectron launches.
pub struct Tube<'a> {
    pub electrodes: TubeElectrodes<'a>,
    pub field: &'a dyn EmField,
    pub volume: TubeVolume,
    pub config: &'a ExactConfig,
    cathode_voltage: f64,
    /// Launch direction: fotocathode towards the first dinode, or the anode without dinodes
    axis: DVec2,
    /// Ends of the emitting face (mm)
    face: (DVec2, DVec2),
}

impl<'a> Tube<'a> {
    pub fn new(
        components: &'a [Component],
        field: &'a dyn EmField,
        config: &'a ExactConfig,
    ) -> Result<Self> {
        let cathode = components
            .iter()
            .find(|c| c.kind == ComponentKind::Fotocathode)
            .ok_or_else(|| PmtError::InvalidScenario("tube has no fotocathode".into()))?;
        let target = components
            .iter()
            .find(|c| c.kind == ComponentKind::Dinode)
            .or_else(|| components.iter().find(|c| c.kind == ComponentKind::Anode))
            .ok_or_else(|| PmtError::InvalidScenario("tube has no anode".into()))?;

        let d = target.position - cathode.position;
        let axis = if d.mag_sq() > 0.0 { d.normalized() } else { DVec2::unit_x() };
        let perp = DVec2::new(-axis.y, axis.x);
        let outline = cathode.outline();
        let mut front = 0.0f64;
        let (mut lo, mut hi) = (0.0f64, 0.0f64);
        for v in &outline {
            let r = *v - cathode.position;
            front = front.max(r.dot(axis));
            lo = lo.min(r.dot(perp));
            hi = hi.max(r.dot(perp));
        }
        let base = cathode.position + axis * (front + units::m_to_mm(config.surface_offset));
        Ok(Self {
            electrodes: TubeElectrodes::from_components(components),
            field,
            volume: TubeVolume::around(components, config.volume_margin_mm),
            config,
            cathode_voltage: cathode.voltage,
            axis,
            face: (base + perp * lo, base + perp * hi),
        })
    }

    /// Replace the default enclosure (component bounding box plus margin).
    pub fn with_volume(mut self, volume: TubeVolume) -> Self {
        self.volume = volume;
        self
    }

    /// Launch point (mm) at fraction `along` of the fotocathode face.
    pub fn launch_point(&self, along: f64) -> DVec2 {
        let (a, b) = self.face;
        a + (b - a) * along.clamp(0.0, 1.0)
    }

    /// Run one photoelectron with kinetic energy `energy_ev` from fraction `along` of the face.
    pub fn launch<R: Rng + ?Sized>(&self, along: f64, energy_ev: f64, rng: &mut R) -> CascadeResult {
        let p = self.launch_point(along);
        let speed = units::speed_from_energy_ev(energy_ev.max(0.0), ELECTRON_MASS, ELECTRON_CHARGE);
        let v = self.axis * speed;
        let volume: &dyn Enclosure = &self.volume;
        let req = CascadeRequest {
            position: DVec3::new(units::mm_to_m(p.x), units::mm_to_m(p.y), 0.0),
            velocity: DVec3::new(v.x, v.y, 0.0),
            time: 0.0,
            field: self.field,
            electrodes: &self.electrodes,
            volume,
            source_voltage: self.cathode_voltage,
            config: self.config,
        };
        simulate_cascade(&req, rng)
    }

    pub fn dynode_count(&self) -> usize {
        self.electrodes.dynodes.len()
    }
}

/// Gain distribution in equal-width bins over `[0, max]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GainHistogram {
    pub max: f64,
    pub counts: Vec<usize>,
}

impl GainHistogram {
    pub fn from_gains(gains: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let max = gains.iter().copied().fold(0.0f64, f64::max);
        let mut counts = vec![0; bins];
        for &g in gains {
            let i = if max > 0.0 {
                ((g / max) * bins as f64).floor() as usize
            } else {
                0
            };
            counts[i.min(bins - 1)] += 1;
        }
        Self { max, counts }
    }

    pub fn bin_width(&self) -> f64 {
        self.max / self.counts.len().max(1) as f64
    }
}

/// Summary of one pulse.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PulseReport {
    /// Terminal gain per photoelectron, launch order
    pub gains: Vec<f64>,
    /// Anode arrival time per photoelectron (s)
    pub arrival_times: Vec<Option<f64>>,
    pub collection_efficiency: f64,
    pub mean_gain: f64,
    pub gain_variance: f64,
    /// Over collected chains (s)
    pub mean_transit_time: f64,
    pub transit_time_spread: f64,
    /// Strikes per dinode, all chains together
    pub dynode_strikes: Vec<usize>,
    pub histogram: GainHistogram,
    /// Σ gain × e (C)
    pub anode_charge: f64,
    pub step_capped: usize,
    pub depth_capped: usize,
}

impl PulseReport {
    pub fn photons(&self) -> usize {
        self.gains.len()
    }

    fn from_results(results: &[CascadeResult], dynodes: usize, bins: usize) -> Self {
        let n = results.len();
        let gains: Vec<f64> = results.iter().map(|r| r.terminal_gain).collect();
        let arrival_times: Vec<Option<f64>> = results.iter().map(|r| r.arrival_time).collect();
        let mut dynode_strikes = vec![0; dynodes];
        for i in results.iter().flat_map(|r| r.dynode_hits()) {
            if let Some(c) = dynode_strikes.get_mut(i) {
                *c += 1;
            }
        }
        let transit: Vec<f64> = results
            .iter()
            .filter(|r| r.reached_anode() && r.terminal_gain > 0.0)
            .filter_map(|r| r.arrival_time)
            .collect();
        let (mean_gain, gain_variance) = mean_and_variance(&gains);
        let (mean_transit_time, transit_var) = mean_and_variance(&transit);

        Self {
            collection_efficiency: if n == 0 { 0.0 } else { transit.len() as f64 / n as f64 },
            mean_gain,
            gain_variance,
            mean_transit_time,
            transit_time_spread: transit_var.sqrt(),
            dynode_strikes,
            histogram: GainHistogram::from_gains(&gains, bins),
            anode_charge: gains.iter().sum::<f64>() * ELEMENTARY_CHARGE,
            step_capped: results.iter().filter(|r| r.step_capped).count(),
            depth_capped: results.iter().filter(|r| r.depth_capped).count(),
            gains,
            arrival_times,
        }
    }
}

/// Population mean and variance; zeros for an empty slice.
fn mean_and_variance(xs: &[f64]) -> (f64, f64) {
    if xs.is_empty() {
        return (0.0, 0.0);
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    (mean, var)
}

/// Launch `pulse.photons` photoelectrons and run their cascades in parallel.
///
/// Launch points, energies and per-cascade seeds are drawn up front from `pulse.seed`, so the
/// report does not depend on thread scheduling.
pub fn simulate_pulse(tube: &Tube<'_>, pulse: &PulseConfig) -> PulseReport {
    profile_scope!("pulse");
    let mut placement = fastrand::Rng::with_seed(pulse.seed);
    let mut master = StdRng::seed_from_u64(pulse.seed);
    let spread = Normal::new(pulse.energy_ev, pulse.energy_spread_ev).ok();

    let launches: Vec<(f64, f64, u64)> = (0..pulse.photons)
        .map(|_| {
            let along = placement.f64();
            let energy = match spread {
                Some(d) if pulse.energy_spread_ev > 0.0 => d.sample(&mut master),
                _ => pulse.energy_ev,
            };
            (along, energy.max(0.0), master.random::<u64>())
        })
        .collect();

    let results: Vec<CascadeResult> = launches
        .par_iter()
        .map(|&(along, energy, seed)| {
            let mut rng = StdRng::seed_from_u64(seed);
            tube.launch(along, energy, &mut rng)
        })
        .collect();

    let report = PulseReport::from_results(&results, tube.dynode_count(), pulse.histogram_bins);
    info!(
        "pulse of {} photoelectrons: collection {:.1}%, mean gain {:.3e}, transit {:.3e} ± {:.1e} s",
        report.photons(),
        report.collection_efficiency * 100.0,
        report.mean_gain,
        report.mean_transit_time,
        report.transit_time_spread
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::Termination;
    use crate::field::UniformField;
    use crate::geometry::Shape;
    use crate::sey::YieldModel;

    fn bounds(kind: ComponentKind, x: f64, y: f64, w: f64, h: f64, voltage: f64) -> Component {
        Component::new(kind, DVec2::new(x + w * 0.5, y + h * 0.5), voltage)
            .with_shape(Shape::Bounds { x, y, w, h })
    }

    fn cathode() -> Component {
        Component::new(ComponentKind::Fotocathode, DVec2::zero(), 0.0)
            .with_shape(Shape::Rect { half_width: 1.0 })
    }

    fn exact() -> ExactConfig {
        ExactConfig {
            dt: 1e-11,
            ..ExactConfig::default()
        }
    }

    #[test]
    fn launch_face_sits_in_front_of_fotocathode() {
        let comps = vec![cathode(), bounds(ComponentKind::Anode, 10.0, -5.0, 2.0, 10.0, 100.0)];
        let field = UniformField::zero();
        let cfg = exact();
        let tube = Tube::new(&comps, &field, &cfg).unwrap();
        let a = tube.launch_point(0.0);
        let b = tube.launch_point(1.0);
        assert!((a.x - 1.001).abs() < 1e-9 && (b.x - 1.001).abs() < 1e-9);
        assert!((a.y + 1.0).abs() < 1e-9 && (b.y - 1.0).abs() < 1e-9);
        assert_eq!(tube.launch_point(7.0), b);
    }

    #[test]
    fn narrow_volume_loses_electrons_before_the_anode() {
        let comps = vec![cathode(), bounds(ComponentKind::Anode, 10.0, -5.0, 2.0, 10.0, 100.0)];
        let field = UniformField::new(DVec3::new(-1000.0, 0.0, 0.0), DVec3::zero());
        let cfg = exact();
        let tube = Tube::new(&comps, &field, &cfg)
            .unwrap()
            .with_volume(TubeVolume::new(DVec2::new(-2.0, -2.0), DVec2::new(5.0, 2.0)));
        let mut rng = StdRng::seed_from_u64(4);
        let r = tube.launch(0.5, 1.0, &mut rng);
        assert_eq!(r.termination, Termination::LeftVolume);
        assert_eq!(r.terminal_gain, 0.0);

        let report = simulate_pulse(
            &tube,
            &PulseConfig {
                photons: 10,
                ..PulseConfig::default()
            },
        );
        assert_eq!(report.collection_efficiency, 0.0);
        assert!(report.arrival_times.iter().all(|t| t.is_none()));
    }

    #[test]
    fn missing_electrodes_are_rejected() {
        let field = UniformField::zero();
        let cfg = exact();
        let only_anode = vec![bounds(ComponentKind::Anode, 10.0, -5.0, 2.0, 10.0, 100.0)];
        assert!(matches!(
            Tube::new(&only_anode, &field, &cfg),
            Err(PmtError::InvalidScenario(_))
        ));
        let only_cathode = vec![cathode()];
        assert!(Tube::new(&only_cathode, &field, &cfg).is_err());
    }

    #[test]
    fn accelerating_gap_collects_every_photoelectron() {
        let comps = vec![cathode(), bounds(ComponentKind::Anode, 10.0, -5.0, 2.0, 10.0, 100.0)];
        // Pushes electrons towards +x
        let field = UniformField::new(DVec3::new(-1000.0, 0.0, 0.0), DVec3::zero());
        let cfg = exact();
        let tube = Tube::new(&comps, &field, &cfg).unwrap();
        let pulse = PulseConfig {
            photons: 40,
            seed: 9,
            ..PulseConfig::default()
        };
        let report = simulate_pulse(&tube, &pulse);
        assert_eq!(report.photons(), 40);
        assert_eq!(report.collection_efficiency, 1.0);
        assert_eq!(report.mean_gain, 1.0);
        assert_eq!(report.gain_variance, 0.0);
        assert!(report.dynode_strikes.is_empty());
        assert!((report.anode_charge - 40.0 * ELEMENTARY_CHARGE).abs() < 1e-30);
        // ~9 mm from rest at 1.76e14 m/s²: about 10 ns
        assert!(report.mean_transit_time > 5e-9 && report.mean_transit_time < 2e-8);
        assert!(report.transit_time_spread < 0.2 * report.mean_transit_time);
        assert!(report.arrival_times.iter().all(|t| t.is_some()));
        assert_eq!(report.histogram.counts.iter().sum::<usize>(), 40);
    }

    #[test]
    fn pulse_is_reproducible() {
        let comps = vec![cathode(), bounds(ComponentKind::Anode, 10.0, -5.0, 2.0, 10.0, 100.0)];
        let field = UniformField::new(DVec3::new(-1000.0, 0.0, 0.0), DVec3::zero());
        let cfg = exact();
        let tube = Tube::new(&comps, &field, &cfg).unwrap();
        let pulse = PulseConfig {
            photons: 16,
            seed: 3,
            ..PulseConfig::default()
        };
        let a = simulate_pulse(&tube, &pulse);
        let b = simulate_pulse(&tube, &pulse);
        assert_eq!(a.gains, b.gains);
        assert_eq!(a.arrival_times, b.arrival_times);
    }

    #[test]
    fn dinode_multiplication_is_counted() {
        // Photoelectrons hit the dinode head-on; each strike yields 0.1·√400 = 2 secondaries
        // that fly back past the fotocathode into the anode.
        let comps = vec![
            cathode(),
            bounds(ComponentKind::Dinode, 10.0, -5.0, 2.0, 10.0, 400.0)
                .with_yield_model(YieldModel::Simple { r: 0.1, beta: 0.5 }),
            bounds(ComponentKind::Anode, -12.0, -5.0, 2.0, 10.0, 800.0),
        ];
        let field = UniformField::zero();
        let cfg = exact();
        let tube = Tube::new(&comps, &field, &cfg).unwrap();
        let pulse = PulseConfig {
            photons: 12,
            seed: 1,
            energy_ev: 200.0,
            energy_spread_ev: 0.0,
            histogram_bins: 4,
        };
        let report = simulate_pulse(&tube, &pulse);
        assert_eq!(report.dynode_strikes, vec![12]);
        assert_eq!(report.collection_efficiency, 1.0);
        assert!((report.mean_gain - 2.0).abs() < 1e-9);
        assert!(report.gain_variance < 1e-18);
        assert_eq!(report.histogram.counts[3], 12);
        assert!((report.histogram.bin_width() - report.histogram.max / 4.0).abs() < 1e-15);
    }

    #[test]
    fn empty_pulse_reports_zeros() {
        let comps = vec![cathode(), bounds(ComponentKind::Anode, 10.0, -5.0, 2.0, 10.0, 100.0)];
        let field = UniformField::zero();
        let cfg = exact();
        let tube = Tube::new(&comps, &field, &cfg).unwrap();
        let report = simulate_pulse(
            &tube,
            &PulseConfig {
                photons: 0,
                ..PulseConfig::default()
            },
        );
        assert_eq!(report.photons(), 0);
        assert_eq!(report.collection_efficiency, 0.0);
        assert_eq!(report.mean_gain, 0.0);
        assert!(report.mean_transit_time.is_finite());
        assert_eq!(report.histogram.counts.iter().sum::<usize>(), 0);
    }

    #[test]
    fn histogram_bins_cover_the_range() {
        let h = GainHistogram::from_gains(&[0.0, 1.0, 2.0, 3.9, 4.0], 4);
        assert_eq!(h.max, 4.0);
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        let flat = GainHistogram::from_gains(&[0.0, 0.0], 0);
        assert_eq!(flat.counts, vec![2]);
    }
}
