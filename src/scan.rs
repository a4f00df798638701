//! Grid scan orchestration.
//!
//! Drives one scan from request to rest position:
//!
//! ```text
//! Idle ──▶ HomingStart ──▶ Traversing ──▶ HomingEnd ──▶ Done
//!   │                          │
//!   │ invalid request          │ per node (horizontal outer, vertical inner):
//!   ▼                          │   move primary → capture primary
//!  error, rig untouched        │   [stereo] move mirrored → capture stereo
//!                              ▼
//!                     capture failures are recorded and skipped
//! ```
//!
//! ## Guarantees
//!
//! - The request is validated before any device is opened.
//! - Devices are opened once, at the start of homing, and dropped once the
//!   scan is done, on every exit path.
//! - The home command is sent at the start and at the end of every scan that
//!   reaches the rig, even after capture failures or cancellation. After a
//!   fatal actuator write failure the end-of-scan home is still attempted.
//! - Pair numbers start at 1 and advance once per grid node; the stereo frame
//!   of a node shares its primary frame's number.
//!
//! Everything runs on the calling thread. Moves and exposures are physical
//! processes that cannot overlap, so there is nothing to parallelize.

use crate::actuator::{ActuatorError, ActuatorLink, SerialActuator};
use crate::camera::{CameraError, CaptureSettings, CaptureSink, CommandCamera, FrameSource};
use crate::config::RigConfig;
use crate::mirror::mirror;
use crate::path::grid_positions;
use crate::request::{RequestError, ScanPlan, ScanRequest};
use crate::session::{SessionError, allocate_session};
use crate::types::{CaptureFailure, CapturedFrame, FrameRole, ScanOutcome, ScanPosition, Session};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid scan request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error(transparent)]
    LinkUnavailable(ActuatorError),
    #[error(transparent)]
    CameraUnavailable(CameraError),
    #[error("{0}")]
    FolderCreation(#[from] SessionError),
    #[error("scan aborted after {} grid nodes: {source}", .outcome.nodes_attempted)]
    ActuatorWrite {
        source: ActuatorError,
        outcome: Box<ScanOutcome>,
    },
}

impl ScanError {
    /// Partial outcome of a scan that failed mid-traversal.
    pub fn outcome(&self) -> Option<&ScanOutcome> {
        match self {
            ScanError::ActuatorWrite { outcome, .. } => Some(outcome),
            _ => None,
        }
    }
}

/// Phases of a scan, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    HomingStart,
    Traversing,
    HomingEnd,
    Done,
}

/// Progress notifications for whoever is watching the scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Planned {
        horizontal: Vec<i64>,
        vertical: Vec<i64>,
        stereo: bool,
    },
    SessionCreated(Session),
    StateChanged(ScanState),
    /// About to command a move; the capture result follows.
    Moving {
        pair_number: u32,
        role: FrameRole,
        position: ScanPosition,
    },
    FrameSaved(CapturedFrame),
    FrameFailed(CaptureFailure),
    Cancelled {
        remaining_nodes: usize,
    },
}

/// Cooperative cancellation, checked between grid nodes.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Opens the rig's devices for the duration of one scan.
pub trait Devices {
    type Actuator: ActuatorLink;
    type Camera: FrameSource;

    fn open_actuator(&self) -> Result<Self::Actuator, ActuatorError>;
    fn open_camera(&self) -> Result<Self::Camera, CameraError>;
}

/// The real rig: serial actuator plus command-driven camera.
#[derive(Debug, Clone)]
pub struct HardwareDevices {
    config: RigConfig,
}

impl HardwareDevices {
    pub fn new(config: &RigConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Devices for HardwareDevices {
    type Actuator = SerialActuator;
    type Camera = CommandCamera;

    fn open_actuator(&self) -> Result<SerialActuator, ActuatorError> {
        SerialActuator::open(
            &self.config.serial,
            &self.config.home,
            self.config.timing.move_settle(),
        )
    }

    fn open_camera(&self) -> Result<CommandCamera, CameraError> {
        CommandCamera::open(&self.config.camera)
    }
}

/// Runs scans against a set of devices.
pub struct Scanner {
    base_dir: PathBuf,
    prefix: String,
    capture: CaptureSettings,
    events: Option<Sender<ScanEvent>>,
    cancel: CancelToken,
}

impl Scanner {
    pub fn from_config(config: &RigConfig) -> Self {
        Self {
            base_dir: config.storage.base_dir.clone(),
            prefix: config.storage.prefix.clone(),
            capture: CaptureSettings::from_config(&config.timing, &config.camera),
            events: None,
            cancel: CancelToken::new(),
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: Sender<ScanEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run one scan.
    ///
    /// Per-frame failures are reported in the returned outcome; only request,
    /// device, folder, and actuator-write problems produce an error.
    pub fn run<D: Devices>(
        &self,
        request: &ScanRequest,
        devices: &D,
    ) -> Result<ScanOutcome, ScanError> {
        let plan = request.plan()?;
        info!(
            horizontal = ?plan.horizontal.coords(),
            vertical = ?plan.vertical.coords(),
            stereo = plan.stereo,
            "scan planned"
        );
        self.emit(ScanEvent::Planned {
            horizontal: plan.horizontal.coords().to_vec(),
            vertical: plan.vertical.coords().to_vec(),
            stereo: plan.stereo,
        });

        self.enter(ScanState::HomingStart);
        let camera = devices
            .open_camera()
            .map_err(ScanError::CameraUnavailable)?;
        let mut actuator = devices
            .open_actuator()
            .map_err(ScanError::LinkUnavailable)?;
        let session = allocate_session(&self.base_dir, &self.prefix)?;
        self.emit(ScanEvent::SessionCreated(session.clone()));

        let mut sink = CaptureSink::new(camera, self.capture);
        let mut outcome = ScanOutcome {
            session: Some(session.clone()),
            ..ScanOutcome::default()
        };

        let traversal = actuator.return_home().and_then(|()| {
            self.enter(ScanState::Traversing);
            self.traverse(&plan, &session, &mut actuator, &mut sink, &mut outcome)
        });

        self.enter(ScanState::HomingEnd);
        let homed = actuator.return_home();
        if let (Err(_), Err(e)) = (&traversal, &homed) {
            warn!(error = %e, "could not return rig home after failed scan");
        }

        drop(sink);
        drop(actuator);
        self.enter(ScanState::Done);

        match traversal.and(homed) {
            Ok(()) => {
                info!(
                    session = session.id,
                    written = outcome.frames_written(),
                    failed = outcome.frames_failed(),
                    "scan complete"
                );
                Ok(outcome)
            }
            Err(source) => Err(ScanError::ActuatorWrite {
                source,
                outcome: Box::new(outcome),
            }),
        }
    }

    fn traverse<A: ActuatorLink, S: FrameSource>(
        &self,
        plan: &ScanPlan,
        session: &Session,
        actuator: &mut A,
        sink: &mut CaptureSink<S>,
        outcome: &mut ScanOutcome,
    ) -> Result<(), ActuatorError> {
        let total = plan.node_count();
        let mut pair_number = 0;

        for position in grid_positions(&plan.horizontal, &plan.vertical) {
            if self.cancel.is_cancelled() {
                let remaining_nodes = total - outcome.nodes_attempted as usize;
                info!(remaining_nodes, "scan cancelled");
                outcome.cancelled = true;
                self.emit(ScanEvent::Cancelled { remaining_nodes });
                break;
            }

            pair_number += 1;
            outcome.nodes_attempted += 1;

            self.capture_at(
                actuator,
                sink,
                session,
                pair_number,
                FrameRole::Primary,
                position,
                outcome,
            )?;
            if plan.stereo {
                self.capture_at(
                    actuator,
                    sink,
                    session,
                    pair_number,
                    FrameRole::Stereo,
                    mirror(position),
                    outcome,
                )?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn capture_at<A: ActuatorLink, S: FrameSource>(
        &self,
        actuator: &mut A,
        sink: &mut CaptureSink<S>,
        session: &Session,
        pair_number: u32,
        role: FrameRole,
        position: ScanPosition,
        outcome: &mut ScanOutcome,
    ) -> Result<(), ActuatorError> {
        debug!(pair = pair_number, %role, %position, "moving");
        self.emit(ScanEvent::Moving {
            pair_number,
            role,
            position,
        });
        actuator.move_to(position)?;

        let result = sink.capture_frame(session, pair_number, role, position);
        self.emit(match &result {
            Ok(frame) => ScanEvent::FrameSaved(frame.clone()),
            Err(failure) => ScanEvent::FrameFailed(failure.clone()),
        });
        outcome.record(result);
        Ok(())
    }

    fn enter(&self, state: ScanState) {
        debug!(?state, "scan state");
        self.emit(ScanEvent::StateChanged(state));
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.events {
            // A printer that went away must not stop the rig mid-grid.
            let _ = tx.send(event);
        }
    }
}
