//! Region selection state machine.

use tracing::{debug, info, trace};

use gifgrab_ipc::{Frame, Point, Rectangle, SelectionPhase};

use crate::compositor::{DimmedOverlay, PreviewCompositor};
use crate::error::SelectionError;
use crate::SelectionResult;

/// Smallest accepted width and height of a selection in pixels.
pub const MIN_SELECTION_SIZE: u32 = 10;

/// State held while a selection is open.
struct SelectionSession {
    background: Frame,
    anchor: Option<Point>,
    composed: Option<(Point, Point)>,
}

/// Turns pointer events over a full-screen snapshot into a validated
/// capture rectangle.
pub struct SelectionMachine<C = DimmedOverlay> {
    phase: SelectionPhase,
    session: Option<SelectionSession>,
    compositor: C,
    last_committed: Option<Rectangle>,
}

impl SelectionMachine<DimmedOverlay> {
    /// Create a machine that previews with [`DimmedOverlay`].
    pub fn new() -> Self {
        Self::with_compositor(DimmedOverlay)
    }
}

impl Default for SelectionMachine<DimmedOverlay> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: PreviewCompositor> SelectionMachine<C> {
    /// Create a machine with a custom preview compositor.
    pub fn with_compositor(compositor: C) -> Self {
        Self {
            phase: SelectionPhase::Closed,
            session: None,
            compositor,
            last_committed: None,
        }
    }

    /// Open a session over `background`.
    pub fn begin(&mut self, background: Frame) -> SelectionResult<()> {
        if self.phase.is_open() {
            return Err(SelectionError::Busy);
        }

        debug!(
            width = background.width,
            height = background.height,
            "Selection opened"
        );
        self.session = Some(SelectionSession {
            background,
            anchor: None,
            composed: None,
        });
        self.phase = SelectionPhase::AwaitingPress;
        Ok(())
    }

    /// Record the drag anchor.
    pub fn press(&mut self, point: Point) -> SelectionResult<()> {
        let session = self.session_in(SelectionPhase::AwaitingPress, "press")?;
        session.anchor = Some(point);
        self.phase = SelectionPhase::Dragging;
        Ok(())
    }

    /// Follow the pointer. Returns the new preview, or `None` when the
    /// rectangle is unchanged since the last preview or no drag is active.
    pub fn drag(&mut self, point: Point) -> SelectionResult<Option<Frame>> {
        if matches!(
            self.phase,
            SelectionPhase::Closed | SelectionPhase::AwaitingPress
        ) {
            return Ok(None);
        }

        let phase = self.phase;
        let session = match self.session.as_mut() {
            Some(session) if phase == SelectionPhase::Dragging => session,
            _ => {
                return Err(SelectionError::InvalidPhase {
                    event: "drag",
                    phase,
                })
            }
        };
        let Some(anchor) = session.anchor else {
            return Ok(None);
        };
        if session.composed == Some((anchor, point)) {
            trace!(?point, "Selection unchanged, preview skipped");
            return Ok(None);
        }

        session.composed = Some((anchor, point));
        let rectangle = Rectangle::from_corners(anchor, point);
        let background = &session.background;
        Ok(Some(self.compositor.compose(background, rectangle)))
    }

    /// Finish the drag. Rectangles below the minimum size discard the
    /// session.
    pub fn release(&mut self, point: Point) -> SelectionResult<Rectangle> {
        let session = self.session_in(SelectionPhase::Dragging, "release")?;
        let anchor = session.anchor.unwrap_or(point);
        let rectangle = Rectangle::from_corners(anchor, point);

        self.session = None;

        if !rectangle.meets_minimum(MIN_SELECTION_SIZE) {
            self.phase = SelectionPhase::Closed;
            debug!(region = %rectangle, "Selection rejected");
            return Err(SelectionError::TooSmall {
                width: rectangle.width(),
                height: rectangle.height(),
                min: MIN_SELECTION_SIZE,
            });
        }

        self.phase = SelectionPhase::Committed;
        info!(region = %rectangle, "Selection committed");
        self.last_committed = Some(rectangle);
        self.phase = SelectionPhase::Closed;
        Ok(rectangle)
    }

    /// Discard an open session. Returns false if none was open.
    pub fn cancel(&mut self) -> bool {
        if !self.phase.is_open() {
            return false;
        }
        self.session = None;
        self.phase = SelectionPhase::Closed;
        debug!("Selection cancelled");
        true
    }

    /// Current phase.
    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    /// Background of the open session.
    pub fn background(&self) -> Option<&Frame> {
        self.session.as_ref().map(|s| &s.background)
    }

    /// Most recently committed rectangle.
    pub fn last_committed(&self) -> Option<Rectangle> {
        self.last_committed
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    fn session_in(
        &mut self,
        expected: SelectionPhase,
        event: &'static str,
    ) -> SelectionResult<&mut SelectionSession> {
        let phase = self.phase;
        match self.session.as_mut() {
            Some(session) if phase == expected => Ok(session),
            _ => Err(SelectionError::InvalidPhase { event, phase }),
        }
    }
}
