//! Backend event payloads
//!
//! Every message on the recognition stream is a tagged JSON object. The
//! payload shapes are validated here, at the deserialization boundary, so
//! the rest of the engine never touches untyped data.

use serde::Deserialize;

/// One OCR token as received from the backend. The meaning of `x`/`y`
/// depends on the batch's coordinate system (grid index or document pixel).
/// Discarded after transformation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecognizedItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Native pixel dimensions of the source bitmap, when the backend reports them
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDimensions {
    pub width: f64,
    pub height: f64,
}

/// One streamed group of recognized items sharing a processing step
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionalBatch {
    #[serde(default)]
    pub grouped_data: Vec<Vec<RawRecognizedItem>>,
    #[serde(default)]
    pub image_dimensions: Option<ImageDimensions>,
    #[serde(default)]
    pub invoice_details: Option<serde_json::Value>,
}

/// Events pushed by the recognition backend, one connection per session
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Session started: reset the registry
    ProcessingStart {},
    /// Pipeline advanced to a named step
    ProcessingStep {
        step: String,
        #[serde(default)]
        message: Option<String>,
    },
    /// A positional batch of recognized items
    PositionalData(PositionalBatch),
    /// Extraction finished; carries the full extraction result
    ProcessingComplete(serde_json::Value),
    /// Backend-side failure
    Error {
        #[serde(default)]
        message: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_processing_start() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"event": "processing_start", "payload": {}}"#).unwrap();
        assert!(matches!(event, StreamEvent::ProcessingStart {}));
    }

    #[test]
    fn test_decode_processing_step() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"event": "processing_step", "payload": {"step": "ocr", "message": "Tekst herkennen"}}"#,
        )
        .unwrap();
        match event {
            StreamEvent::ProcessingStep { step, message } => {
                assert_eq!(step, "ocr");
                assert_eq!(message.as_deref(), Some("Tekst herkennen"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_positional_data() {
        let event: StreamEvent = serde_json::from_str(
            r#"{
                "event": "positional_data",
                "payload": {
                    "groupedData": [[
                        {"text": "Leverancier A", "x": 2, "y": 3, "confidence": 0.95},
                        {"text": "450", "x": 3, "y": 3, "width": 40, "height": 18}
                    ]],
                    "imageDimensions": {"width": 1240, "height": 1754}
                }
            }"#,
        )
        .unwrap();
        match event {
            StreamEvent::PositionalData(batch) => {
                assert_eq!(batch.grouped_data.len(), 1);
                assert_eq!(batch.grouped_data[0].len(), 2);
                assert_eq!(batch.grouped_data[0][0].text, "Leverancier A");
                assert!(batch.grouped_data[0][1].confidence.is_none());
                let dims = batch.image_dimensions.unwrap();
                assert!((dims.width - 1240.0).abs() < 0.001);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_without_message() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"event": "error", "payload": {}}"#).unwrap();
        assert!(matches!(event, StreamEvent::Error { message: None }));
    }

    #[test]
    fn test_decode_complete_keeps_raw_payload() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"event": "processing_complete", "payload": {"supplier": "Leverancier B", "total": 280}}"#,
        )
        .unwrap();
        match event {
            StreamEvent::ProcessingComplete(value) => {
                assert_eq!(value["supplier"], "Leverancier B");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
