/// Face handle lifecycle. Opening a face costs a file read and a parse, so
/// fonts keep it open according to a policy and close it when the
/// outermost call that needed it returns.

use crate::error::FontError;
use crate::font::face::{FaceLoader, FontFace, FontSource};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceMode {
    /// Close as soon as the outermost call returns.
    AutoClose,
    /// Keep open until the font is dropped.
    #[default]
    FreeClose,
    /// Keep open until `close` is called.
    ManualClose,
    /// Never close, even on request.
    AlwaysOpen,
}

pub struct FaceHandle {
    source: FontSource,
    loader: Rc<dyn FaceLoader>,
    face: Option<Rc<dyn FontFace>>,
    mode: FaceMode,
    depth: usize,
    opens: usize,
}

impl FaceHandle {
    pub fn new(source: FontSource, loader: Rc<dyn FaceLoader>, mode: FaceMode) -> Self {
        Self { source, loader, face: None, mode, depth: 0, opens: 0 }
    }

    /// A handle over the same source that reuses the open face, if any.
    pub fn share(&self) -> Self {
        Self {
            source: self.source.clone(),
            loader: self.loader.clone(),
            face: self.face.clone(),
            mode: self.mode,
            depth: 0,
            opens: 0,
        }
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }

    pub fn mode(&self) -> FaceMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FaceMode) {
        self.mode = mode;
    }

    pub fn is_open(&self) -> bool {
        self.face.is_some()
    }

    /// How many times this handle has opened its face.
    pub fn open_count(&self) -> usize {
        self.opens
    }

    /// Open the face if needed and enter one nesting level.
    pub fn enter(&mut self) -> Result<Rc<dyn FontFace>, FontError> {
        let face = match &self.face {
            Some(face) => face.clone(),
            None => {
                let face = self.loader.open(&self.source)?;
                self.opens += 1;
                log::debug!("opened face {:?}", self.source);
                self.face = Some(face.clone());
                face
            }
        };
        self.depth += 1;
        Ok(face)
    }

    /// Leave one nesting level, closing when policy allows.
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 && self.mode == FaceMode::AutoClose {
            self.face = None;
        }
    }

    /// Explicit close. Ignored while a call is in progress or when the
    /// face is pinned open.
    pub fn close(&mut self) {
        if self.depth == 0 && self.mode != FaceMode::AlwaysOpen {
            self.face = None;
        }
    }
}
