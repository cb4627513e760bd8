use banao_contracts::aspect::AspectRatio;
use banao_contracts::images::{EncodedImage, ImageSlot, PreviewSummary};

#[derive(Debug, Default)]
pub struct SessionState {
    pub person_image: Option<EncodedImage>,
    pub style_image: Option<EncodedImage>,
    pub selected_aspect_ratio: AspectRatio,
    pub is_generating: bool,
    pub last_error: Option<String>,
    pub generated_image: Option<String>,
}

impl SessionState {
    pub fn slot_mut(&mut self, slot: ImageSlot) -> &mut Option<EncodedImage> {
        match slot {
            ImageSlot::Person => &mut self.person_image,
            ImageSlot::Style => &mut self.style_image,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            person: self.person_image.as_ref().map(SlotSummary::of),
            style: self.style_image.as_ref().map(SlotSummary::of),
            aspect_ratio: self.selected_aspect_ratio,
            is_generating: self.is_generating,
            last_error: self.last_error.clone(),
            generated_image: self.generated_image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    pub media_type: String,
    pub preview: Option<PreviewSummary>,
}

impl SlotSummary {
    fn of(image: &EncodedImage) -> Self {
        Self {
            media_type: image.media_type().to_string(),
            preview: image.preview().summary(),
        }
    }

    pub fn describe(&self) -> String {
        match &self.preview {
            Some(preview) => format!("{} [{}]", preview.describe(), self.media_type),
            None => format!("[{}]", self.media_type),
        }
    }
}

/// Read-only view of the session; carries no preview handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub person: Option<SlotSummary>,
    pub style: Option<SlotSummary>,
    pub aspect_ratio: AspectRatio,
    pub is_generating: bool,
    pub last_error: Option<String>,
    pub generated_image: Option<String>,
}

impl SessionSnapshot {
    pub fn can_generate(&self) -> bool {
        !self.is_generating && self.person.is_some() && self.style.is_some()
    }
}
