//! Trajectory tracker executable.
//!
//! # Architecture
//!
//! - Initialise the session, logging and parameters
//! - Start a background thread receiving vehicle states, paths and target velocities
//! - Wait until a vehicle state and a path have been received
//! - Main loop:
//!     - Compute the Stanley steering command from the latest errors
//!     - Publish the command, the lateral reference point and the tracker status

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
use comms_if::net::{zmq, Envelope, NetParams, Topic, TopicError, TopicPublisher, TopicSubscriber};
use nav_lib::{
    geom::Path,
    tracker::{Params, PathTracker, TrackerError, TrackerShared, VehicleState},
};
use util::{
    archive::Archiver,
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

/// Archive of the tracking statistics samples, relative to the session archive directory.
const STATS_ARCHIVE_PATH: &str = "tracker_stats.csv";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("tracker_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Trajectory Tracker Executable\n");
    info!(
        "Running on: {}",
        host::get_hostname().unwrap_or_else(|| String::from("unknown host"))
    );
    info!("Session directory: {:?}\n", session.session_root);

    let run = shutdown_flag().wrap_err("Failed to install the shutdown handler")?;

    // ---- LOAD PARAMETERS ----

    let params: Params =
        util::params::load("tracker.toml").wrap_err("Could not load tracker params")?;
    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    let cycle_period = frequency_to_period(params.update_frequency_hz)
        .ok_or_else(|| eyre!("Invalid tracker update frequency"))?;

    // ---- INITIALISE MODULES ----

    let shared = Arc::new(TrackerShared::new(params.clone()));

    let mut tracker = PathTracker::new();
    tracker
        .init(params)
        .wrap_err("Failed to initialise the path tracker")?;

    match Archiver::from_path(&session, STATS_ARCHIVE_PATH) {
        Ok(a) => tracker.set_archiver(a),
        Err(e) => warn!("Tracking statistics will not be archived: {}", e),
    }

    info!("PathTracker init complete");

    // ---- INITIALISE NETWORK ----

    let ctx = zmq::Context::new();

    let publisher = TopicPublisher::new(&ctx, &net_params.tracker_pub_endpoint)
        .wrap_err("Failed to create the tracker publisher")?;

    let subscriber = TopicSubscriber::new(
        &ctx,
        &net_params.tracker_sub_endpoints,
        &[Topic::State, Topic::Path, Topic::TargetVelocity],
    )
    .wrap_err("Failed to create the tracker subscriber")?;

    let bg_run = run.clone();
    let bg_shared = shared.clone();
    let bg_jh = thread::Builder::new()
        .name(String::from("tracker_inputs"))
        .spawn(move || bg_thread(subscriber, bg_run, bg_shared))
        .wrap_err("Failed to start the input thread")?;

    info!("Network initialised");

    // ---- STARTUP BARRIER ----

    info!("Waiting for a vehicle state and a path");

    while is_running(&run) && !(shared.has_state() && shared.has_path()) {
        thread::sleep(STARTUP_POLL_PERIOD);
    }

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    while is_running(&run) {
        let cycle_start_instant = Instant::now();

        // ---- CONTROL ----

        match tracker.proc(&shared) {
            Ok((output, status)) => {
                publish(&publisher, Topic::AckermannCmd, &output.command);
                publish(&publisher, Topic::LateralRef, &output.lateral_ref);
                publish(&publisher, Topic::TrackerStatus, &status);
            }
            Err(TrackerError::PoisonError) => {
                raise_error!("Tracker state lock poisoned");
            }
            Err(e) => debug!("No command this cycle: {}", e),
        }

        // ---- CYCLE MANAGEMENT ----

        if let Some(overrun) = sleep_remaining(cycle_start_instant, cycle_period) {
            warn!("Cycle overran by {:.06} s", overrun.as_secs_f64());
        }
    }

    // ---- SHUTDOWN ----

    info!("Shutting down");

    tracker.stats().log_summary();

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

/// Background thread, stores new vehicle states, paths and target velocities as they arrive.
fn bg_thread(subscriber: TopicSubscriber, run: Arc<AtomicBool>, shared: Arc<TrackerShared>) {
    let mut was_connected = false;

    while is_running(&run) {
        let connected = subscriber.connected();
        if connected != was_connected {
            match connected {
                true => info!("Tracker inputs connected"),
                false => warn!("Tracker inputs disconnected"),
            }
            was_connected = connected;
        }

        let envelope = match subscriber.try_recv() {
            Ok(Some(e)) => e,
            Ok(None) => continue,
            Err(TopicError::RecvError(e)) => {
                error!("Error receiving tracker inputs: {}", e);
                break;
            }
            Err(e) => {
                warn!("Invalid message on the tracker inputs: {}", e);
                continue;
            }
        };

        let result = match envelope {
            Envelope::State(state) => shared.update_vehicle_state(VehicleState::from_msg(&state)),
            Envelope::Path(path) => shared.install_path(Path::from_msg(&path)),
            Envelope::TargetVelocity(v) => shared.set_target_velocity(v.speed_ms),
            other => {
                debug!("Ignoring {:?} message", other.topic());
                Ok(())
            }
        };

        match result {
            Ok(()) => (),
            Err(TrackerError::EmptyPath) => warn!("Received an empty path, keeping the current one"),
            Err(e) => {
                error!("Could not store tracker input: {}", e);
                break;
            }
        }
    }
}
