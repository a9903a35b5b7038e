//! One-dimensional glazing heat balance.
//!
//! Every solid layer contributes two surface nodes. Neighbouring nodes are
//! linked by conductances: solid conduction, gap conduction plus long-wave
//! exchange (plus pillar bridging), and film coefficients at both boundaries.
//! The temperature dependent coefficients are updated by fixed-point
//! iteration around a tridiagonal solve.
//!
//! Infrared transmittance of the solids and airflow through shade openings
//! are not modelled.

use std::f64::consts::PI;

use anyhow::{Result, ensure};

use crate::backend::{DeflectionResults, ThermalBackend, ThermalRequest, ThermalSystem};
use crate::thermal::igu::{DeflectionConfig, Igu};
use crate::thermal::{BoundaryModel, Environment, Environments};

/// Stefan-Boltzmann constant [W/(m^2*K^4)].
const SIGMA: f64 = 5.670_374_419e-8;
/// Standard gravity [m/s^2].
const GRAVITY: f64 = 9.806_65;
/// Lower bound of natural convection coefficients [W/(m^2*K)].
const H_MIN: f64 = 0.1;
/// Smallest pivot accepted by the tridiagonal solver.
const PIVOT_MIN: f64 = 1e-30;

#[derive(Debug, Clone, Copy)]
pub struct ReferenceThermal {
    pub max_iterations: usize,
    /// Largest node temperature change accepted as converged [K].
    pub tolerance: f64,
}

impl ReferenceThermal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ReferenceThermal {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl ThermalBackend for ReferenceThermal {
    fn build(&self, request: &ThermalRequest) -> Result<Box<dyn ThermalSystem>> {
        let igu = request.igu;
        let env = request.environments;
        ensure!(!igu.solids.is_empty(), "IGU has no solid layers");
        ensure!(
            igu.gaps.len() + 1 == igu.solids.len(),
            "IGU has {} solid layers but {} gaps",
            igu.solids.len(),
            igu.gaps.len()
        );
        for (i, solid) in igu.solids.iter().enumerate() {
            ensure!(
                solid.thickness > 0.0 && solid.conductivity > 0.0,
                "solid layer {i} needs positive thickness and conductivity"
            );
        }
        ensure!(
            (env.inside.air_temperature - env.outside.air_temperature).abs() > 1e-9,
            "indoor and outdoor air temperatures must differ"
        );
        let applied = &request.deflection.applied_loads;
        ensure!(
            applied.len() <= igu.solids.len(),
            "{} applied loads for {} solid layers",
            applied.len(),
            igu.solids.len()
        );

        let chain = Chain {
            igu,
            env,
            solver: self,
        };
        let nominal: Vec<f64> = igu.gaps.iter().map(|g| g.thickness).collect();

        let (solution, deflection) = match &request.deflection.config {
            DeflectionConfig::Disabled => {
                let solution = chain.solve(&nominal, true)?;
                (solution, undeflected(igu, &nominal))
            }
            DeflectionConfig::Construction {
                temperature,
                pressure,
            } => {
                let first = chain.solve(&nominal, true)?;
                let deflection =
                    plate_deflection(igu, env, &first.temperatures, *temperature, *pressure, applied)?;
                log::debug!(
                    "deflected gap widths {:?} m",
                    deflection.mean_gap_widths
                );
                (chain.solve(&deflection.mean_gap_widths, true)?, deflection)
            }
            DeflectionConfig::Measured(widths) => {
                ensure!(
                    widths.len() == nominal.len(),
                    "{} measured gap widths for {} gaps",
                    widths.len(),
                    nominal.len()
                );
                ensure!(
                    widths.iter().all(|&w| w > 0.0),
                    "measured gap widths must be positive"
                );
                let deflection = measured_deflection(igu, widths);
                (chain.solve(widths, true)?, deflection)
            }
        };

        let widths = solution.widths.clone();
        let dark = if env.outside.direct_solar_radiation > 0.0 {
            chain.solve(&widths, false)?
        } else {
            solution.clone()
        };

        let u = dark.heat_flow / (env.outside.air_temperature - env.inside.air_temperature);
        let solar_gain = if env.outside.direct_solar_radiation > 0.0 {
            (solution.heat_flow - dark.heat_flow) / env.outside.direct_solar_radiation
        } else {
            0.0
        };

        Ok(Box::new(ChainSystem {
            u,
            solar_gain,
            solid_conductivities: igu.solids.iter().map(|s| s.conductivity).collect(),
            gap_conductivities: solution
                .gap_conductances
                .iter()
                .zip(&widths)
                .map(|(h, w)| h * w)
                .collect(),
            heat_flow: solution.heat_flow,
            temperatures: solution.temperatures,
            deflection,
        }))
    }
}

struct ChainSystem {
    u: f64,
    solar_gain: f64,
    temperatures: Vec<f64>,
    heat_flow: f64,
    solid_conductivities: Vec<f64>,
    gap_conductivities: Vec<f64>,
    deflection: DeflectionResults,
}

impl ThermalSystem for ChainSystem {
    fn u(&self) -> f64 {
        self.u
    }

    fn shgc(&self, total_solar_transmittance: f64) -> f64 {
        total_solar_transmittance + self.solar_gain
    }

    fn layer_temperatures(&self) -> Vec<f64> {
        self.temperatures.clone()
    }

    fn heat_flow(&self) -> f64 {
        self.heat_flow
    }

    fn solid_effective_conductivities(&self) -> Vec<f64> {
        self.solid_conductivities.clone()
    }

    fn gap_effective_conductivities(&self) -> Vec<f64> {
        self.gap_conductivities.clone()
    }

    fn deflection(&self) -> DeflectionResults {
        self.deflection.clone()
    }
}

#[derive(Debug, Clone)]
struct Solution {
    /// Front and back surface temperature of each solid [K].
    temperatures: Vec<f64>,
    /// Heat flow into the room [W/m^2].
    heat_flow: f64,
    /// Gap conductances [W/(m^2*K)].
    gap_conductances: Vec<f64>,
    widths: Vec<f64>,
}

/// Film coefficient split into its convective and radiative parts.
#[derive(Debug, Clone, Copy)]
struct Film {
    convective: f64,
    radiative: f64,
}

impl Film {
    /// Heat flow from the environment into a surface at `t_surface`.
    fn flow(&self, env: &Environment, t_surface: f64) -> f64 {
        self.convective * (env.air_temperature - t_surface)
            + self.radiative * (env.radiation_temperature - t_surface)
    }
}

struct Chain<'a> {
    igu: &'a Igu,
    env: &'a Environments,
    solver: &'a ReferenceThermal,
}

impl Chain<'_> {
    fn solve(&self, widths: &[f64], with_solar: bool) -> Result<Solution> {
        let igu = self.igu;
        let n = 2 * igu.solids.len();
        let t_out = self.env.outside.air_temperature;
        let t_in = self.env.inside.air_temperature;
        let irradiance = if with_solar {
            self.env.outside.direct_solar_radiation
        } else {
            0.0
        };

        // Linear initial guess between the two air temperatures.
        let mut temperatures: Vec<f64> = (0..n)
            .map(|k| t_out + (t_in - t_out) * (k as f64 + 1.0) / (n as f64 + 1.0))
            .collect();
        let mut gap_conductances = vec![0.0; igu.gaps.len()];
        let mut converged = false;

        for iteration in 0..self.solver.max_iterations {
            // Tridiagonal coefficients: a[k]*T[k-1] + b[k]*T[k] + c[k]*T[k+1] = d[k]
            let mut a = vec![0.0; n];
            let mut b = vec![0.0; n];
            let mut c = vec![0.0; n];
            let mut d = vec![0.0; n];

            let outside = self.outdoor_film(temperatures[0]);
            b[0] += outside.convective + outside.radiative;
            d[0] += outside.convective * t_out
                + outside.radiative * self.env.outside.radiation_temperature;

            let inside = self.indoor_film(temperatures[n - 1]);
            b[n - 1] += inside.convective + inside.radiative;
            d[n - 1] += inside.convective * t_in
                + inside.radiative * self.env.inside.radiation_temperature;

            for (i, solid) in igu.solids.iter().enumerate() {
                link(2 * i, solid.conductivity / solid.thickness, &mut a, &mut b, &mut c);
                let absorbed = irradiance * solid.solar_absorptance;
                d[2 * i] += 0.5 * absorbed;
                d[2 * i + 1] += 0.5 * absorbed;
            }

            for (j, width) in widths.iter().enumerate() {
                let h = self.gap_conductance(j, *width, temperatures[2 * j + 1], temperatures[2 * j + 2]);
                gap_conductances[j] = h;
                link(2 * j + 1, h, &mut a, &mut b, &mut c);
            }

            solve_tridiagonal(&a, &mut b, &c, &mut d)?;
            let change = d
                .iter()
                .zip(&temperatures)
                .map(|(new, old)| (new - old).abs())
                .fold(0.0, f64::max);
            temperatures = d;
            log::trace!("iteration {iteration}: max temperature change {change:.3e} K");
            if change < self.solver.tolerance {
                converged = true;
                break;
            }
        }
        if !converged {
            log::warn!(
                "glazing heat balance did not converge in {} iterations",
                self.solver.max_iterations
            );
        }
        ensure!(
            temperatures.iter().all(|t| t.is_finite()),
            "glazing heat balance produced non-finite temperatures"
        );

        let last = temperatures[n - 1];
        let heat_flow = -self.indoor_film(last).flow(&self.env.inside, last);
        Ok(Solution {
            temperatures,
            heat_flow,
            gap_conductances,
            widths: widths.to_vec(),
        })
    }

    fn outdoor_film(&self, t_surface: f64) -> Film {
        let env = &self.env.outside;
        let emissivity = self.igu.solids[0].emissivity_front;
        film(env, emissivity, t_surface, || 4.0 + 4.0 * env.air_speed)
    }

    fn indoor_film(&self, t_surface: f64) -> Film {
        let env = &self.env.inside;
        let emissivity = self
            .igu
            .solids
            .last()
            .map_or(0.84, |s| s.emissivity_back);
        // The indoor face of a glazing tilted from horizontal faces down.
        let cos_up = -self.igu.tilt.to_radians().cos();
        film(env, emissivity, t_surface, || {
            natural_h(t_surface - env.air_temperature, cos_up)
        })
    }

    fn gap_conductance(&self, j: usize, width: f64, t1: f64, t2: f64) -> f64 {
        let gap = &self.igu.gaps[j];
        let mean = 0.5 * (t1 + t2);
        let conduction = gap.mixture.conductivity(mean) / width.max(1e-6);
        let e1 = self.igu.solids[j].emissivity_back;
        let e2 = self.igu.solids[j + 1].emissivity_front;
        let radiation = if e1 > 0.0 && e2 > 0.0 {
            4.0 * SIGMA * mean.powi(3) / (1.0 / e1 + 1.0 / e2 - 1.0)
        } else {
            0.0
        };
        let pillar = gap.pillar.as_ref().map_or(0.0, |p| p.conductance());
        conduction + radiation + pillar
    }
}

fn film(env: &Environment, emissivity: f64, t_surface: f64, convective: impl Fn() -> f64) -> Film {
    let radiative = || {
        if emissivity <= 0.0 || env.emissivity <= 0.0 {
            return 0.0;
        }
        let tr = env.radiation_temperature;
        let e = 1.0 / (1.0 / emissivity + 1.0 / env.emissivity - 1.0);
        e * SIGMA * (t_surface * t_surface + tr * tr) * (t_surface + tr)
    };
    match env.model {
        BoundaryModel::CalculateH => Film {
            convective: convective(),
            radiative: radiative(),
        },
        BoundaryModel::SetH(h) => Film {
            convective: h,
            radiative: radiative(),
        },
        BoundaryModel::HPrescribed(h) => Film {
            convective: h,
            radiative: 0.0,
        },
    }
}

/// TARP natural convection coefficient [W/(m^2*K)].
///
/// `dt` is surface minus air temperature, `cos_up` the cosine between the
/// surface normal and the upward vertical.
fn natural_h(dt: f64, cos_up: f64) -> f64 {
    let abs_dt = dt.abs();
    if abs_dt < 1e-15 {
        return H_MIN;
    }
    let dt_third = abs_dt.powf(1.0 / 3.0);
    let abs_cos = cos_up.abs();
    let h = if abs_cos < 0.707 {
        1.31 * dt_third
    } else if dt * cos_up > 0.0 {
        // Warm surface facing up or cold surface facing down.
        9.482 * dt_third / (7.238 - abs_cos)
    } else {
        1.810 * dt_third / (1.382 + abs_cos)
    };
    h.max(H_MIN)
}

/// Couples node `k` and `k + 1` with conductance `g`.
fn link(k: usize, g: f64, a: &mut [f64], b: &mut [f64], c: &mut [f64]) {
    b[k] += g;
    b[k + 1] += g;
    c[k] -= g;
    a[k + 1] -= g;
}

/// Solves the tridiagonal system `a` (sub), `b` (main), `c` (super) in place
/// by forward elimination and back substitution. `b` is overwritten and the
/// solution ends up in `d`.
///
/// Fails on a vanishing pivot, which means a node is not coupled to anything.
fn solve_tridiagonal(a: &[f64], b: &mut [f64], c: &[f64], d: &mut [f64]) -> Result<()> {
    let n = b.len();
    if n == 0 {
        return Ok(());
    }
    for i in 1..n {
        ensure!(b[i - 1].abs() > PIVOT_MIN, "zero pivot at node {}", i - 1);
        let w = a[i] / b[i - 1];
        b[i] -= w * c[i - 1];
        d[i] -= w * d[i - 1];
    }
    ensure!(b[n - 1].abs() > PIVOT_MIN, "zero pivot at node {}", n - 1);
    d[n - 1] /= b[n - 1];
    for i in (0..n - 1).rev() {
        d[i] = (d[i] - c[i] * d[i + 1]) / b[i];
    }
    Ok(())
}

fn undeflected(igu: &Igu, widths: &[f64]) -> DeflectionResults {
    let n = igu.solids.len();
    DeflectionResults {
        max_layer_deflections: vec![0.0; n],
        mean_layer_deflections: vec![0.0; n],
        panes_load: vec![0.0; n],
        max_gap_widths: widths.to_vec(),
        mean_gap_widths: widths.to_vec(),
    }
}

/// Flexural rigidity times the plate shape factor: load per unit of
/// center deflection [Pa/m] for a simply supported rectangular pane.
fn plate_stiffness(igu: &Igu, solid: usize) -> f64 {
    let s = &igu.solids[solid];
    let rigidity = s.youngs_modulus * s.thickness.powi(3) / (12.0 * (1.0 - s.poisson_ratio.powi(2)));
    let shape = 1.0 / igu.width.powi(2) + 1.0 / igu.height.powi(2);
    PI.powi(6) * rigidity * shape * shape / 16.0
}

/// Ratio of mean to center deflection of the first plate mode.
const MEAN_TO_MAX: f64 = 4.0 / (PI * PI);

/// Newton iterations allowed for the sealed-gap equilibrium.
const DEFLECTION_ITERATIONS: usize = 50;
/// Largest pane deflection residual accepted as converged [m].
const DEFLECTION_TOLERANCE: f64 = 1e-10;

/// Center and mean deflections of sealed gaps under gas expansion, applied
/// loads and self weight.
///
/// Each gap holds the gas sealed into it, so its pressure follows the ideal
/// gas law in both temperature and volume. Pane deflections and gap pressures
/// are solved together by Newton iteration on the mean deflections.
fn plate_deflection(
    igu: &Igu,
    env: &Environments,
    temperatures: &[f64],
    seal_temperature: f64,
    seal_pressure: f64,
    applied: &[f64],
) -> Result<DeflectionResults> {
    let n = igu.solids.len();
    let nominal: Vec<f64> = igu.gaps.iter().map(|g| g.thickness).collect();
    // Pressure of each gap at its nominal width.
    let heated: Vec<f64> = (0..igu.gaps.len())
        .map(|j| {
            let mean = 0.5 * (temperatures[2 * j + 1] + temperatures[2 * j + 2]);
            seal_pressure * mean / seal_temperature
        })
        .collect();

    let cos_tilt = igu.tilt.to_radians().cos();
    let external: Vec<f64> = igu
        .solids
        .iter()
        .enumerate()
        .map(|(i, s)| {
            s.density * GRAVITY * s.thickness * cos_tilt + applied.get(i).copied().unwrap_or(0.0)
        })
        .collect();
    let compliance: Vec<f64> = (0..n)
        .map(|i| MEAN_TO_MAX / plate_stiffness(igu, i))
        .collect();

    let widths_of = |deflections: &[f64]| -> Vec<f64> {
        nominal
            .iter()
            .enumerate()
            .map(|(j, d)| d - deflections[j] + deflections[j + 1])
            .collect()
    };
    let pressures_of = |widths: &[f64]| -> Vec<f64> {
        heated
            .iter()
            .zip(&nominal)
            .zip(widths)
            .map(|((p, d), w)| p * d / w)
            .collect()
    };
    let loads_of = |pressures: &[f64]| -> Vec<f64> {
        (0..n)
            .map(|i| {
                let front = if i == 0 {
                    env.outside.pressure
                } else {
                    pressures[i - 1]
                };
                let back = if i + 1 == n {
                    env.inside.pressure
                } else {
                    pressures[i]
                };
                front - back + external[i]
            })
            .collect()
    };

    let mut mean = vec![0.0; n];
    let mut converged = false;
    for iteration in 0..DEFLECTION_ITERATIONS {
        let widths = widths_of(&mean);
        let pressures = pressures_of(&widths);
        let loads = loads_of(&pressures);
        let residual: Vec<f64> = (0..n).map(|i| mean[i] - compliance[i] * loads[i]).collect();
        let size = residual.iter().fold(0.0, |m: f64, r| m.max(r.abs()));
        log::trace!("deflection iteration {iteration}: residual {size:.3e} m");
        if size < DEFLECTION_TOLERANCE {
            converged = true;
            break;
        }

        // Tridiagonal Jacobian of the residual. Gap j lies behind pane j and
        // in front of pane j + 1.
        let mut a = vec![0.0; n];
        let mut b = vec![1.0; n];
        let mut c = vec![0.0; n];
        for (j, (p, w)) in pressures.iter().zip(&widths).enumerate() {
            let s = p / w;
            b[j] += compliance[j] * s;
            c[j] -= compliance[j] * s;
            a[j + 1] -= compliance[j + 1] * s;
            b[j + 1] += compliance[j + 1] * s;
        }
        let mut step: Vec<f64> = residual.iter().map(|r| -r).collect();
        solve_tridiagonal(&a, &mut b, &c, &mut step)?;

        // Halve the step until every gap stays open.
        let mut factor = 1.0;
        loop {
            let trial: Vec<f64> = mean
                .iter()
                .zip(&step)
                .map(|(w, s)| w + factor * s)
                .collect();
            if widths_of(&trial).iter().all(|&w| w > 0.0) {
                mean = trial;
                break;
            }
            factor *= 0.5;
            ensure!(factor > 1e-9, "deflection step cannot keep the gaps open");
        }
    }
    if !converged {
        log::warn!("gap deflection did not converge in {DEFLECTION_ITERATIONS} iterations");
    }

    let mean_gap_widths = widths_of(&mean);
    let panes_load = loads_of(&pressures_of(&mean_gap_widths));
    let max_layer_deflections: Vec<f64> = mean.iter().map(|w| w / MEAN_TO_MAX).collect();
    let max_gap_widths = widths_of(&max_layer_deflections)
        .into_iter()
        .map(|w| w.max(0.0))
        .collect();
    Ok(DeflectionResults {
        max_layer_deflections,
        mean_layer_deflections: mean,
        panes_load,
        max_gap_widths,
        mean_gap_widths,
    })
}

/// Deflections implied by measured mean gap widths, taking the outdoor pane
/// as the reference.
fn measured_deflection(igu: &Igu, widths: &[f64]) -> DeflectionResults {
    let mut mean_layer_deflections = vec![0.0];
    for (gap, width) in igu.gaps.iter().zip(widths) {
        let previous = mean_layer_deflections.last().copied().unwrap_or(0.0);
        mean_layer_deflections.push(previous + width - gap.thickness);
    }
    let max_layer_deflections: Vec<f64> = mean_layer_deflections
        .iter()
        .map(|w| w / MEAN_TO_MAX)
        .collect();
    let panes_load = max_layer_deflections
        .iter()
        .enumerate()
        .map(|(i, w)| w * plate_stiffness(igu, i))
        .collect();
    let max_gap_widths = igu
        .gaps
        .iter()
        .enumerate()
        .map(|(j, gap)| gap.thickness - max_layer_deflections[j] + max_layer_deflections[j + 1])
        .collect();
    DeflectionResults {
        max_layer_deflections,
        mean_layer_deflections,
        panes_load,
        max_gap_widths,
        mean_gap_widths: widths.to_vec(),
    }
}
