//! Closed loop navigation simulation.
//!
//! Runs the path planner and the trajectory tracker in-process against a kinematic bicycle on a
//! generated road, each at its own rate in simulated time. The simulation ends when the vehicle
//! reaches the end of the path, `duration_s` of simulated time has passed, or on Ctrl-C.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::eyre, eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::sync::Arc;

// Internal
use nav_lib::{
    planner::{self, PathPlanner, PlannerSnapshot},
    sim::{self, KinematicBicycle},
    tracker::{self, PathTracker, TrackerShared, VehicleState},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    signal::{is_running, shutdown_flag},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("nav_sim", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    info!("Navigation Simulation\n");
    info!("Session directory: {:?}\n", session.session_root);

    let run = shutdown_flag().wrap_err("Failed to install the shutdown handler")?;

    // ---- LOAD PARAMETERS ----

    let sim_params: sim::Params =
        util::params::load("sim.toml").wrap_err("Could not load sim params")?;
    sim_params.validate().wrap_err("Invalid sim params")?;

    let planner_params: planner::Params =
        util::params::load("planner.toml").wrap_err("Could not load planner params")?;
    let tracker_params: tracker::Params =
        util::params::load("tracker.toml").wrap_err("Could not load tracker params")?;

    if tracker_params.yaw_convention != tracker::YawConvention::East {
        return Err(eyre!("The simulated vehicle reports yaw from +X, set yaw_convention = \"east\""));
    }

    let planner_period_s = 1.0 / planner_params.update_frequency_hz;
    let tracker_period_s = 1.0 / tracker_params.update_frequency_hz;

    // ---- SCENARIO ----

    let (goals, grid) = sim_params
        .scenario
        .build()
        .wrap_err("Failed to build the scenario")?;

    if goals.len() < 2 {
        return Err(eyre!("The scenario has fewer than 2 goals"));
    }

    info!(
        "Scenario has {} goals on a {}x{} grid",
        goals.len(),
        grid.width(),
        grid.height()
    );

    let grid = Arc::new(grid);

    let start_yaw = (goals[1].y - goals[0].y).atan2(goals[1].x - goals[0].x);
    let mut vehicle = KinematicBicycle::new(
        VehicleState {
            x: goals[0].x,
            y: goals[0].y,
            yaw: start_yaw,
            ..Default::default()
        },
        sim_params.wheelbase_m,
    );

    // ---- INITIALISE MODULES ----

    let mut planner = PathPlanner::new();
    planner
        .init(planner_params)
        .wrap_err("Failed to initialise the path planner")?;

    let shared = TrackerShared::new(tracker_params.clone());
    let mut tracker = PathTracker::new();
    tracker
        .init(tracker_params)
        .wrap_err("Failed to initialise the path tracker")?;

    match Archiver::from_path(&session, "tracker_stats.csv") {
        Ok(a) => tracker.set_archiver(a),
        Err(e) => warn!("Tracking statistics will not be archived: {}", e),
    }

    // ---- MAIN LOOP ----

    let mut sim_time_s = 0.0;
    let mut next_plan_s = 0.0;
    let mut next_control_s = 0.0;
    let mut command = None;

    info!("Beginning simulation\n");

    while is_running(&run) && sim_time_s < sim_params.duration_s {
        shared
            .update_vehicle_state(vehicle.state)
            .wrap_err("Failed to update the vehicle state")?;

        // ---- PLANNING ----

        if sim_time_s >= next_plan_s {
            next_plan_s += planner_period_s;

            let snapshot = PlannerSnapshot {
                waypoints: goals.clone(),
                grid: grid.clone(),
                vehicle_state: Some(vehicle.to_msg()),
            };

            match planner.proc(&snapshot) {
                Ok((output, status)) => {
                    debug!("Planner status: {:?}", status);
                    shared
                        .install_path(output.path)
                        .wrap_err("Failed to install the path")?;
                    shared
                        .set_target_velocity(output.target_velocity_ms)
                        .wrap_err("Failed to set the target velocity")?;
                }
                Err(e) => warn!("Planning failed: {}", e),
            }
        }

        // ---- CONTROL ----

        if sim_time_s >= next_control_s {
            next_control_s += tracker_period_s;

            match tracker.proc(&shared) {
                Ok((output, status)) => {
                    if status.target_index + 1 >= status.path_len {
                        info!("End of path reached at {:.2} s", sim_time_s);
                        break;
                    }
                    command = Some(output.command);
                }
                Err(e) => debug!("No command this cycle: {}", e),
            }
        }

        // ---- VEHICLE ----

        if let Some(ref c) = command {
            vehicle.step(c.speed, c.steering_angle, sim_params.step_s);
        }

        sim_time_s += sim_params.step_s;
    }

    // ---- SHUTDOWN ----

    info!(
        "Simulation ended at {:.2} s with the vehicle at ({:.2}, {:.2})",
        sim_time_s, vehicle.state.x, vehicle.state.y
    );

    tracker.stats().log_summary();

    session.exit();

    Ok(())
}
