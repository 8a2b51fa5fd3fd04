//! Path planner executable.
//!
//! # Architecture
//!
//! - Initialise the session, logging and parameters
//! - Start a background thread receiving goals, maps and vehicle states from the bus
//! - Wait until goals and a map have been received
//! - Main loop:
//!     - Snapshot the latest inputs
//!     - Plan and, if needed, reroute the path
//!     - Publish the path, its visualisation, the target velocity and the planner status

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::eyre, eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use comms_if::{
    msg::PlannerStatus,
    net::{zmq, Envelope, NetParams, Topic, TopicError, TopicPublisher, TopicSubscriber},
};
use nav_lib::{
    map::OccupancyGrid,
    planner::{Params, PathPlanner, PlannerError, PlannerInputs},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    raise_error,
    session::Session,
    signal::{is_running, shutdown_flag},
    time::{frequency_to_period, sleep_remaining},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period at which the start-up barrier checks the inputs.
const STARTUP_POLL_PERIOD: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("planner_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Path Planner Executable\n");
    info!(
        "Running on: {}",
        host::get_hostname().unwrap_or_else(|| String::from("unknown host"))
    );
    info!("Session directory: {:?}\n", session.session_root);

    let run = shutdown_flag().wrap_err("Failed to install the shutdown handler")?;

    // ---- LOAD PARAMETERS ----

    let params: Params =
        util::params::load("planner.toml").wrap_err("Could not load planner params")?;
    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    let cycle_period = frequency_to_period(params.update_frequency_hz)
        .ok_or_else(|| eyre!("Invalid planner update frequency"))?;

    // ---- INITIALISE MODULES ----

    let mut planner = PathPlanner::new();
    planner
        .init(params)
        .wrap_err("Failed to initialise the path planner")?;

    info!("PathPlanner init complete");

    // ---- INITIALISE NETWORK ----

    let ctx = zmq::Context::new();

    let publisher = TopicPublisher::new(&ctx, &net_params.planner_pub_endpoint)
        .wrap_err("Failed to create the planner publisher")?;

    let subscriber = TopicSubscriber::new(
        &ctx,
        &net_params.planner_sub_endpoints,
        &[Topic::Goals, Topic::Map, Topic::State],
    )
    .wrap_err("Failed to create the planner subscriber")?;

    let inputs = Arc::new(PlannerInputs::new());

    let bg_run = run.clone();
    let bg_inputs = inputs.clone();
    let bg_jh = thread::Builder::new()
        .name(String::from("planner_inputs"))
        .spawn(move || bg_thread(subscriber, bg_run, bg_inputs))
        .wrap_err("Failed to start the input thread")?;

    info!("Network initialised");

    // ---- STARTUP BARRIER ----

    info!("Waiting for goals and a map");

    while is_running(&run) && !(inputs.has_goals() && inputs.has_grid()) {
        thread::sleep(STARTUP_POLL_PERIOD);
    }

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    while is_running(&run) {
        let cycle_start_instant = Instant::now();

        // ---- PLANNING ----

        let result = inputs.snapshot().and_then(|snapshot| planner.proc(&snapshot));

        let status = match result {
            Ok((output, status)) => {
                publish(&publisher, Topic::Path, &output.path.to_msg());
                publish(&publisher, Topic::VizPath, &output.viz);
                publish(
                    &publisher,
                    Topic::TargetVelocity,
                    &comms_if::msg::TargetVelocity {
                        speed_ms: output.target_velocity_ms,
                    },
                );
                status
            }
            Err(PlannerError::PoisonError) => {
                raise_error!("Planner inputs lock poisoned");
            }
            Err(e) => {
                debug!("Planning cycle skipped: {}", e);
                PlannerStatus::Stalled
            }
        };

        publish(&publisher, Topic::PlannerStatus, &status);

        // ---- CYCLE MANAGEMENT ----

        if let Some(overrun) = sleep_remaining(cycle_start_instant, cycle_period) {
            warn!("Cycle overran by {:.06} s", overrun.as_secs_f64());
        }
    }

    // ---- SHUTDOWN ----

    info!("Shutting down");

    if bg_jh.join().is_err() {
        warn!("Input thread panicked");
    }

    session.exit();

    info!("End of execution");

    Ok(())
}

/// Publish a message, logging any failure.
fn publish<T: serde::Serialize>(publisher: &TopicPublisher, topic: Topic, msg: &T) {
    if let Err(e) = publisher.publish(topic, msg) {
        warn!("Could not publish {:?}: {}", topic, e);
    }
}

/// Background thread, stores new goals, maps and vehicle states as they arrive.
fn bg_thread(subscriber: TopicSubscriber, run: Arc<AtomicBool>, inputs: Arc<PlannerInputs>) {
    let mut was_connected = false;

    while is_running(&run) {
        let connected = subscriber.connected();
        if connected != was_connected {
            match connected {
                true => info!("Planner inputs connected"),
                false => warn!("Planner inputs disconnected"),
            }
            was_connected = connected;
        }

        let envelope = match subscriber.try_recv() {
            Ok(Some(e)) => e,
            Ok(None) => continue,
            Err(TopicError::RecvError(e)) => {
                error!("Error receiving planner inputs: {}", e);
                break;
            }
            Err(e) => {
                warn!("Invalid message on the planner inputs: {}", e);
                continue;
            }
        };

        let result = match envelope {
            Envelope::Goals(goals) => {
                debug!("Received {} goals", goals.points.len());
                inputs.set_goals(goals.points)
            }
            Envelope::Map(msg) => match OccupancyGrid::from_msg(&msg) {
                Ok(grid) => inputs.set_grid(grid),
                Err(e) => {
                    warn!("Rejected occupancy grid: {}", e);
                    Ok(())
                }
            },
            Envelope::State(state) => inputs.set_vehicle_state(state),
            other => {
                debug!("Ignoring {:?} message", other.topic());
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Could not store planner input: {}", e);
            break;
        }
    }
}
