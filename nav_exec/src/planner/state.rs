//! Path planner module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::{
    collision::{count_runs, find_opening, opening_window, scan_swath},
    reroute::reroute,
    Obstruction, ObstructionPolicy, Opening, Params, PlannerError, PlannerSnapshot,
    SPLICE_MARGIN_SAMPLES,
};
use crate::geom::{generate_cubic_path, Path};
use crate::map::OccupancyGrid;
use comms_if::msg::{PlannerStatus, VizPath};
use util::{module::State, params::LoadError, session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path planner module state
#[derive(Default)]
pub struct PathPlanner {
    params: Option<Params>,

    /// The last path published which was clear or successfully rerouted
    last_safe_path: Option<Path>,

    /// Obstruction avoided on the previous cycle, used to only archive new reroutes
    last_obstruction: Option<Obstruction>,
}

/// Output of one planning cycle.
#[derive(Debug, Clone)]
pub struct PlannerOutput {
    /// Path for the tracker
    pub path: Path,

    /// The same path for visualisation
    pub viz: VizPath,

    pub target_velocity_ms: f64,
}

/// Outcome of checking a path against the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// No collisions, the path is unchanged
    Clear,

    /// The path was rerouted around the obstruction through the opening
    Rerouted {
        obstruction: Obstruction,
        opening: Opening,
    },
}

/// Archived record of a reroute.
#[derive(Serialize)]
struct RerouteRecord {
    obstruction: Obstruction,
    opening_width_m: f64,
    opening_dist_m: f64,
    feasible: bool,
    path: Path,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PathPlanner {
    type InitData = Params;
    type InitError = LoadError;

    type InputData = PlannerSnapshot;
    type OutputData = PlannerOutput;
    type StatusReport = PlannerStatus;
    type ProcError = PlannerError;

    /// Initialise the planner with its parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;

        self.params = Some(init_data);
        self.last_safe_path = None;
        self.last_obstruction = None;

        Ok(())
    }

    /// Plan a path from the snapshot's waypoints around the obstacles in its grid.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let params = self.params.clone().ok_or(PlannerError::NotInit)?;

        if let Some(s) = input_data.vehicle_state {
            trace!("Planning with vehicle at ({:.2}, {:.2})", s.pose.x, s.pose.y);
        }

        // ---- SPLINE ----

        let (xs, ys) = input_data.waypoint_xy();
        if xs.len() < 2 {
            return Err(PlannerError::NotEnoughWaypoints(xs.len()));
        }

        let raw_path = generate_cubic_path(&xs, &ys, params.path_step_m)?;

        // ---- COLLISION CHECK AND AVOIDANCE ----

        let (path, target_velocity_ms, status) = match self.determine_path(&raw_path, &input_data.grid) {
            Ok((path, Verdict::Clear)) => {
                if self.last_obstruction.take().is_some() {
                    info!("Path is clear");
                }
                (path, params.target_velocity_ms, PlannerStatus::Clear)
            }
            Ok((path, Verdict::Rerouted { obstruction, opening })) => {
                let opening_width_m = opening.width_m();
                let opening_dist_m = opening.dist_m();
                let feasible = opening_width_m >= params.vehicle_width_m();

                let (velocity, status) = if feasible {
                    (
                        params.target_velocity_ms,
                        PlannerStatus::Avoiding { opening_width_m, opening_dist_m },
                    )
                }
                else {
                    (0.0, PlannerStatus::Blocked { opening_width_m })
                };

                if self.last_obstruction != Some(obstruction) {
                    if feasible {
                        info!(
                            "Avoiding obstruction over samples {} to {} through a {:.1} m \
                            opening {:.1} m from the path",
                            obstruction.first, obstruction.last, opening_width_m, opening_dist_m
                        );
                    }
                    else {
                        warn!(
                            "Opening of {:.1} m is narrower than the vehicle ({:.1} m), \
                            stopping",
                            opening_width_m,
                            params.vehicle_width_m()
                        );
                    }

                    session::save_with_timestamp(
                        "planner/reroute.json",
                        RerouteRecord {
                            obstruction,
                            opening_width_m,
                            opening_dist_m,
                            feasible,
                            path: path.clone(),
                        },
                    );
                }
                self.last_obstruction = Some(obstruction);

                (path, velocity, status)
            }
            Err(e @ PlannerError::RerouteOutOfBounds { .. }) => {
                warn!("Reroute rejected, keeping the previous safe path: {}", e);

                self.last_obstruction = None;
                let path = self.last_safe_path.clone().unwrap_or_else(|| raw_path.clone());

                (path, 0.0, PlannerStatus::RerouteRejected)
            }
            Err(e) => return Err(e),
        };

        if status != PlannerStatus::RerouteRejected {
            self.last_safe_path = Some(path.clone());
        }

        debug!(
            "Planned {} sample path, target velocity {:.2} m/s",
            path.len(),
            target_velocity_ms
        );

        let stamp_s = session::try_get_elapsed_seconds().unwrap_or(0.0);
        let viz = path.to_viz(&params.frame_id, stamp_s);

        Ok((
            PlannerOutput {
                path,
                viz,
                target_velocity_ms,
            },
            status,
        ))
    }
}

impl PathPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the path against the grid, rerouting around any obstruction.
    ///
    /// A path with no collisions is returned unchanged. With [`ObstructionPolicy::FirstRun`] the
    /// rerouted path is scanned again beyond the detour and each later run of collisions is
    /// rerouted in turn, the verdict then carrying the narrowest opening used. The feasibility of
    /// the returned detour is not judged here.
    pub fn determine_path(
        &self,
        path: &Path,
        grid: &OccupancyGrid,
    ) -> Result<(Path, Verdict), PlannerError> {
        let params = self.params.as_ref().ok_or(PlannerError::NotInit)?;
        let policy = params.obstruction_policy;

        let collisions = scan_swath(path, grid, params.vehicle_half_width_m);

        // Later runs sit in the untouched tail of the path, so there can be no more reroutes
        // than runs in the first scan
        let max_reroutes = match policy {
            ObstructionPolicy::Span => 1,
            ObstructionPolicy::FirstRun => count_runs(&collisions),
        };

        let mut current = path.clone();
        let mut collisions = collisions;
        let mut verdict = Verdict::Clear;

        for _ in 0..max_reroutes {
            let obstruction = match policy.obstruction(&collisions) {
                Some(o) => o,
                None => break,
            };

            debug!(
                "{} colliding samples, obstruction from {} to {}",
                collisions.len(),
                obstruction.first,
                obstruction.last
            );

            let window = opening_window(&current, grid, obstruction.first);
            let opening = find_opening(&window);

            let rerouted = reroute(&current, &obstruction, opening.dist_m(), params.path_step_m)?;

            // Index in the rerouted path where the original samples resume
            let tail_len = current.len().saturating_sub(obstruction.last + SPLICE_MARGIN_SAMPLES);
            let tail_start = rerouted.len().saturating_sub(tail_len);

            verdict = match verdict {
                Verdict::Rerouted { opening: narrowest, .. }
                    if narrowest.width_samples <= opening.width_samples =>
                {
                    verdict
                }
                _ => Verdict::Rerouted { obstruction, opening },
            };

            current = rerouted;

            if policy == ObstructionPolicy::Span {
                break;
            }

            collisions = scan_swath(&current, grid, params.vehicle_half_width_m)
                .into_iter()
                .filter(|&n| n >= tail_start)
                .collect();

            if !collisions.is_empty() {
                info!("Further obstruction beyond the detour from sample {}", collisions[0]);
            }
        }

        Ok((current, verdict))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::OCCUPIED;
    use comms_if::msg::Point2D;
    use nalgebra::Vector2;
    use std::sync::Arc;

    fn params() -> Params {
        Params {
            update_frequency_hz: 10.0,
            frame_id: "map".into(),
            target_velocity_ms: 5.0,
            vehicle_half_width_m: 1.0,
            path_step_m: 0.1,
            obstruction_policy: ObstructionPolicy::Span,
        }
    }

    fn planner() -> PathPlanner {
        let mut p = PathPlanner::new();
        p.init(params()).unwrap();
        p
    }

    fn snapshot(points: &[(f64, f64)], grid: OccupancyGrid) -> PlannerSnapshot {
        PlannerSnapshot {
            waypoints: points.iter().map(|&(x, y)| Point2D { x, y }).collect(),
            grid: Arc::new(grid),
            vehicle_state: None,
        }
    }

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(600, 400, 0.1, Vector2::new(-5.0, -20.0)).unwrap()
    }

    #[test]
    fn test_not_init() {
        let mut p = PathPlanner::new();
        let snap = snapshot(&[(0.0, 0.0), (1.0, 0.0)], OccupancyGrid::empty());
        assert_eq!(p.proc(&snap).unwrap_err(), PlannerError::NotInit);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut p = PathPlanner::new();
        let mut bad = params();
        bad.vehicle_half_width_m = -1.0;
        assert!(p.init(bad).is_err());
    }

    #[test]
    fn test_not_enough_waypoints() {
        let mut p = planner();
        let snap = snapshot(&[(0.0, 0.0)], OccupancyGrid::empty());
        assert_eq!(p.proc(&snap).unwrap_err(), PlannerError::NotEnoughWaypoints(1));

        let snap = snapshot(&[(1.0, 1.0), (1.0, 1.0)], OccupancyGrid::empty());
        assert_eq!(p.proc(&snap).unwrap_err(), PlannerError::NotEnoughWaypoints(1));
    }

    #[test]
    fn test_rejected_reroute_keeps_safe_path() {
        let mut p = planner();

        // First cycle is clear
        let snap = snapshot(&[(0.0, 0.0), (40.0, 0.0)], grid());
        let (safe, status) = p.proc(&snap).unwrap();
        assert_eq!(status, PlannerStatus::Clear);

        // Obstacle right after the scan margin, too close to the start to reroute
        let mut g = grid();
        g.fill_rect(Vector2::new(14.0, -3.0), Vector2::new(16.0, 3.0), OCCUPIED);
        let snap = snapshot(&[(0.0, 0.0), (40.0, 0.0)], g);

        let (out, status) = p.proc(&snap).unwrap();
        assert_eq!(status, PlannerStatus::RerouteRejected);
        assert_eq!(out.target_velocity_ms, 0.0);
        assert_eq!(out.path, safe.path);
    }

    #[test]
    fn test_first_run_reroutes_every_obstacle() {
        let mut params = params();
        params.obstruction_policy = ObstructionPolicy::FirstRun;
        let mut p = PathPlanner::new();
        p.init(params).unwrap();

        // Two separate bands across the road, each with room to pass on either side
        let mut g = OccupancyGrid::new(800, 400, 0.1, Vector2::new(-5.0, -20.0)).unwrap();
        g.fill_rect(Vector2::new(19.0, -3.0), Vector2::new(21.0, 3.0), OCCUPIED);
        g.fill_rect(Vector2::new(45.0, -3.0), Vector2::new(47.0, 3.0), OCCUPIED);
        let waypoints = [(0.0, 0.0), (30.0, 0.0), (65.0, 0.0)];

        let raw = generate_cubic_path(&[0.0, 30.0, 65.0], &[0.0, 0.0, 0.0], 0.1).unwrap();
        assert_eq!(count_runs(&scan_swath(&raw, &g, 1.0)), 2);

        let snap = snapshot(&waypoints, g);
        for _ in 0..3 {
            let (out, status) = p.proc(&snap).unwrap();

            match status {
                PlannerStatus::Avoiding { .. } => (),
                s => panic!("Expected Avoiding, got {:?}", s),
            }
            assert_eq!(out.target_velocity_ms, 5.0);
            assert!(scan_swath(&out.path, &snap.grid, 1.0).is_empty());
        }

        // Both detours leave the centreline
        let (out, _) = p.proc(&snap).unwrap();
        let off_near = |x0: f64| {
            out.path
                .iter()
                .filter(|(x, _, _)| (x - x0).abs() < 0.5)
                .all(|(_, y, _)| y.abs() > 3.0)
        };
        assert!(off_near(20.0));
        assert!(off_near(46.0));
    }

    #[test]
    fn test_span_treats_bands_as_one() {
        let p = planner();

        let mut g = OccupancyGrid::new(800, 400, 0.1, Vector2::new(-5.0, -20.0)).unwrap();
        g.fill_rect(Vector2::new(19.0, -3.0), Vector2::new(21.0, 3.0), OCCUPIED);
        g.fill_rect(Vector2::new(45.0, -3.0), Vector2::new(47.0, 3.0), OCCUPIED);

        let raw = generate_cubic_path(&[0.0, 30.0, 65.0], &[0.0, 0.0, 0.0], 0.1).unwrap();
        let first_collision = scan_swath(&raw, &g, 1.0)[0];
        let last_collision = *scan_swath(&raw, &g, 1.0).last().unwrap();

        match p.determine_path(&raw, &g).unwrap() {
            (_, Verdict::Rerouted { obstruction, .. }) => {
                assert_eq!(obstruction.first, first_collision);
                assert_eq!(obstruction.last, last_collision);
            }
            (_, v) => panic!("Expected a reroute, got {:?}", v),
        }
    }

    #[test]
    fn test_viz_matches_path() {
        let mut p = planner();
        let snap = snapshot(&[(0.0, 0.0), (10.0, 5.0)], OccupancyGrid::empty());
        let (out, _) = p.proc(&snap).unwrap();

        assert_eq!(out.viz.poses.len(), out.path.len());
        assert_eq!(out.viz.frame_id, "map");
        for (pose, (x, y, _)) in out.viz.poses.iter().zip(out.path.iter()) {
            assert_eq!(pose.position, [x, y, 0.0]);
        }
    }
}
