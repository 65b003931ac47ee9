//! Job descriptor construction
//!
//! Turns an uploaded object's locator into the transformation job the
//! worker consumes. Construction is pure: no I/O, no failure modes.

use crate::models::{Filter, ImageParams, JobDescriptor};

/// Builds job descriptors from a fixed transformation profile.
#[derive(Debug, Clone)]
pub struct JobDescriptorBuilder {
    template: ImageParams,
}

impl Default for JobDescriptorBuilder {
    fn default() -> Self {
        Self::new(reference_profile())
    }
}

impl JobDescriptorBuilder {
    /// Use `template` for every job; its `image` field is overwritten per job.
    pub fn new(template: ImageParams) -> Self {
        Self { template }
    }

    pub fn build(&self, locator: &str) -> JobDescriptor {
        let mut image_params = self.template.clone();
        image_params.image = locator.to_string();

        JobDescriptor {
            image_params,
            image_locator: locator.to_string(),
        }
    }

    pub fn template(&self) -> &ImageParams {
        &self.template
    }
}

/// Default transformation: trim, centre crop to 500x500, mirror, then the
/// resize/crop/rotate filter chain.
pub fn reference_profile() -> ImageParams {
    ImageParams {
        trim: true,
        trim_tolerance: 10,
        crop_left: 0.1,
        crop_top: 0.1,
        crop_right: 0.9,
        crop_bottom: 0.9,
        width: 500,
        height: 500,
        h_flip: true,
        h_align: "center".to_string(),
        v_align: "middle".to_string(),
        smart: true,
        filters: vec![
            Filter::new("resize", "90x1000"),
            Filter::new("crop", "0.6,0.3,0.9,0.9"),
            Filter::new("rotate", "90"),
        ],
        ..ImageParams::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_sets_locator_in_both_places() {
        let job = JobDescriptorBuilder::default().build("foo.png");

        assert_eq!(job.image_locator, "foo.png");
        assert_eq!(job.image_params.image, "foo.png");
    }

    #[test]
    fn test_build_does_not_mutate_template() {
        let builder = JobDescriptorBuilder::default();
        let _ = builder.build("a.png");
        let second = builder.build("b.png");

        assert!(builder.template().image.is_empty());
        assert_eq!(second.image_params.image, "b.png");
    }

    #[test]
    fn test_reference_profile_wire_format() {
        let job = JobDescriptorBuilder::default().build("foo.png");
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(
            value,
            json!({
                "image_params": {
                    "image": "foo.png",
                    "trim": true,
                    "trim_tolerance": 10,
                    "crop_left": 0.1,
                    "crop_top": 0.1,
                    "crop_right": 0.9,
                    "crop_bottom": 0.9,
                    "width": 500,
                    "height": 500,
                    "h_flip": true,
                    "h_align": "center",
                    "v_align": "middle",
                    "smart": true,
                    "filters": [
                        {"name": "resize", "args": "90x1000"},
                        {"name": "crop", "args": "0.6,0.3,0.9,0.9"},
                        {"name": "rotate", "args": "90"}
                    ]
                },
                "image_url": "foo.png"
            })
        );
    }

    #[test]
    fn test_custom_template() {
        let template = ImageParams {
            width: 120,
            fit_in: true,
            ..ImageParams::default()
        };
        let job = JobDescriptorBuilder::new(template).build("thumb.jpg");
        let value = serde_json::to_value(&job.image_params).unwrap();

        assert_eq!(
            value,
            json!({"image": "thumb.jpg", "fit_in": true, "width": 120})
        );
    }
}
