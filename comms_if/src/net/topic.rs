//! # Bus topics
//!
//! Typed publishing and subscribing on top of [`MonitoredSocket`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

use super::{MonitoredSocket, MonitoredSocketError, SocketOptions};
use crate::msg::{
    AckermannDrive, Goals, OccupancyGridMsg, Path2D, PlannerStatus, PoseStamped, State2D,
    TargetVelocity, TrackerStatus, VizPath
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A publisher bound to an endpoint.
pub struct TopicPublisher {
    socket: MonitoredSocket
}

/// A subscriber connected to one or more publishers.
pub struct TopicSubscriber {
    socket: MonitoredSocket
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Topics available on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Goals,
    Map,
    State,
    Path,
    VizPath,
    TargetVelocity,
    AckermannCmd,
    LateralRef,
    PlannerStatus,
    TrackerStatus
}

/// A message received from the bus.
#[derive(Debug, Clone)]
pub enum Envelope {
    Goals(Goals),
    Map(OccupancyGridMsg),
    State(State2D),
    Path(Path2D),
    VizPath(VizPath),
    TargetVelocity(TargetVelocity),
    AckermannCmd(AckermannDrive),
    LateralRef(PoseStamped),
    PlannerStatus(PlannerStatus),
    TrackerStatus(TrackerStatus)
}

#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to {0:?}: {1}")]
    SubscribeError(Topic, zmq::Error),

    #[error("Could not send the message: {0}")]
    SendError(zmq::Error),

    #[error("Could not receive a message: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the message: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the {0:?} message: {1}")]
    DeserializeError(Topic, serde_json::Error),

    #[error("Received a message which is not UTF-8")]
    NonUtf8Message,

    #[error("Received a message for an unknown topic: {0}")]
    UnknownTopic(String)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Topic {
    /// All topics, in no particular order.
    pub const ALL: [Topic; 10] = [
        Topic::Goals,
        Topic::Map,
        Topic::State,
        Topic::Path,
        Topic::VizPath,
        Topic::TargetVelocity,
        Topic::AckermannCmd,
        Topic::LateralRef,
        Topic::PlannerStatus,
        Topic::TrackerStatus
    ];

    /// The prefix used on the wire for this topic.
    ///
    /// No prefix is a prefix of another, since subscription filters match on prefixes.
    pub fn prefix(&self) -> &'static str {
        match self {
            Topic::Goals => "goals",
            Topic::Map => "map",
            Topic::State => "state",
            Topic::Path => "path",
            Topic::VizPath => "viz_path",
            Topic::TargetVelocity => "target_velocity",
            Topic::AckermannCmd => "ackermann_cmd",
            Topic::LateralRef => "lateral_ref",
            Topic::PlannerStatus => "planner_status",
            Topic::TrackerStatus => "tracker_status"
        }
    }

    /// Find the topic for a wire prefix.
    pub fn from_prefix(prefix: &str) -> Option<Topic> {
        Topic::ALL.iter().copied().find(|t| t.prefix() == prefix)
    }
}

impl Envelope {
    /// The topic this message is published on.
    pub fn topic(&self) -> Topic {
        match self {
            Envelope::Goals(_) => Topic::Goals,
            Envelope::Map(_) => Topic::Map,
            Envelope::State(_) => Topic::State,
            Envelope::Path(_) => Topic::Path,
            Envelope::VizPath(_) => Topic::VizPath,
            Envelope::TargetVelocity(_) => Topic::TargetVelocity,
            Envelope::AckermannCmd(_) => Topic::AckermannCmd,
            Envelope::LateralRef(_) => Topic::LateralRef,
            Envelope::PlannerStatus(_) => Topic::PlannerStatus,
            Envelope::TrackerStatus(_) => Topic::TrackerStatus
        }
    }

    /// Parse a `"<prefix> <json>"` frame.
    pub fn decode(frame: &str) -> Result<Self, TopicError> {
        let (prefix, body) = match frame.find(' ') {
            Some(i) => (&frame[..i], &frame[i + 1..]),
            None => (frame, "")
        };

        let topic = Topic::from_prefix(prefix)
            .ok_or_else(|| TopicError::UnknownTopic(prefix.to_string()))?;

        let de = |e| TopicError::DeserializeError(topic, e);

        Ok(match topic {
            Topic::Goals => Envelope::Goals(serde_json::from_str(body).map_err(de)?),
            Topic::Map => Envelope::Map(serde_json::from_str(body).map_err(de)?),
            Topic::State => Envelope::State(serde_json::from_str(body).map_err(de)?),
            Topic::Path => Envelope::Path(serde_json::from_str(body).map_err(de)?),
            Topic::VizPath => Envelope::VizPath(serde_json::from_str(body).map_err(de)?),
            Topic::TargetVelocity => Envelope::TargetVelocity(
                serde_json::from_str(body).map_err(de)?
            ),
            Topic::AckermannCmd => Envelope::AckermannCmd(serde_json::from_str(body).map_err(de)?),
            Topic::LateralRef => Envelope::LateralRef(serde_json::from_str(body).map_err(de)?),
            Topic::PlannerStatus => Envelope::PlannerStatus(
                serde_json::from_str(body).map_err(de)?
            ),
            Topic::TrackerStatus => Envelope::TrackerStatus(
                serde_json::from_str(body).map_err(de)?
            ),
        })
    }
}

/// Build the `"<prefix> <json>"` frame for a message.
pub fn encode<T: Serialize>(topic: Topic, msg: &T) -> Result<String, TopicError> {
    let body = serde_json::to_string(msg)
        .map_err(TopicError::SerializationError)?;

    Ok(format!("{} {}", topic.prefix(), body))
}

impl TopicPublisher {
    /// Bind a new publisher to the given endpoint.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, endpoint: &str) -> Result<Self, TopicError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, endpoint)
            .map_err(TopicError::SocketError)?;

        Ok(Self { socket })
    }

    /// Publish a message on the given topic.
    pub fn publish<T: Serialize>(&self, topic: Topic, msg: &T) -> Result<(), TopicError> {
        let frame = encode(topic, msg)?;

        self.socket.send(frame.as_str(), 0)
            .map_err(TopicError::SendError)
    }
}

impl TopicSubscriber {
    /// Connect a new subscriber to each endpoint and subscribe to the given topics.
    ///
    /// Publishers may start after subscribers, so this does not wait for a connection.
    pub fn new(
        ctx: &zmq::Context,
        endpoints: &[String],
        topics: &[Topic]
    ) -> Result<Self, TopicError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            ..Default::default()
        };

        // MonitoredSocket connects to one endpoint, further endpoints are connected directly
        let (first, rest) = match endpoints.split_first() {
            Some(s) => s,
            None => return Err(TopicError::SocketError(MonitoredSocketError::CouldNotConnect(None)))
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, first)
            .map_err(TopicError::SocketError)?;

        for endpoint in rest {
            socket.connect(endpoint)
                .map_err(|e| TopicError::SocketError(MonitoredSocketError::CouldNotConnect(Some(e))))?;
        }

        // The trailing space stops "path" from also matching "path_..." style prefixes
        for topic in topics {
            socket.set_subscribe(format!("{} ", topic.prefix()).as_bytes())
                .map_err(|e| TopicError::SubscribeError(*topic, e))?;
        }

        Ok(Self { socket })
    }

    /// Receive the next message, returning `Ok(None)` if none arrived before the receive timeout.
    pub fn try_recv(&self) -> Result<Option<Envelope>, TopicError> {
        let frame = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(TopicError::NonUtf8Message),
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(TopicError::RecvError(e))
        };

        let envelope = Envelope::decode(&frame)?;
        trace!("Received {:?} message", envelope.topic());

        Ok(Some(envelope))
    }

    /// Return if the subscriber is connected to at least one publisher.
    pub fn connected(&self) -> bool {
        self.socket.connected()
    }
}
