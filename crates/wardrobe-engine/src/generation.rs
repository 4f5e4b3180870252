use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::data_url::{extract_base64_payload, extract_mime_type, to_data_url, DEFAULT_MIME_TYPE};
use crate::error::{truncate_text, Result, WardrobeError};
use crate::resolver::AssetResolver;

pub const CLOTHING_ASPECT_RATIO: &str = "1:1";
pub const TRY_ON_ASPECT_RATIO: &str = "3:4";

const TRY_ON_INSTRUCTIONS: &str = "\
Create a full-body photo of the person shown in the first image wearing the clothing shown in the second image.
- Maintain the identity, facial features, and hairstyle of the person.
- Adapt the clothing to fit the person's body naturally.
- The pose should be natural and elegant.
- High photorealism, 4k resolution style.
- Output a full body shot.";

pub fn clothing_prompt(description: &str) -> String {
    format!(
        "Generate a high-quality, flat-lay photo of a clothing item based on this description: \"{}\". \
The background should be clean white or neutral. Return only one image.",
        description.trim()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineImage { data: String, mime_type: String },
}

impl ContentPart {
    pub fn inline_image(data_url: &str) -> Self {
        Self::InlineImage {
            data: extract_base64_payload(data_url).to_string(),
            mime_type: extract_mime_type(data_url),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => json!({ "text": text }),
            Self::InlineImage { data, mime_type } => json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": data,
                }
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
    pub aspect_ratio: String,
}

impl GenerationRequest {
    pub fn to_payload(&self) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": self.parts.iter().map(ContentPart::to_json).collect::<Vec<Value>>(),
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": {
                    "aspectRatio": self.aspect_ratio,
                }
            }
        })
    }

    fn text(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            ContentPart::Text(text) => Some(text.as_str()),
            ContentPart::InlineImage { .. } => None,
        })
    }
}

/// Data URL of the first inline image in the first candidate, if any.
pub fn extract_first_image(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)?;

    parts.iter().find_map(|part| {
        let inline = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)?;
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .filter(|data| !data.is_empty())?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE);
        Some(format!("data:{mime_type};base64,{data}"))
    })
}

pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;
    fn generate_content(&self, request: &GenerationRequest) -> Result<Value>;
}

pub struct GeminiBackend {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
    timeout: Duration,
}

impl GeminiBackend {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http: HttpClient::new(),
            timeout: config.request_timeout,
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_content(&self, request: &GenerationRequest) -> Result<Value> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(WardrobeError::MissingApiKey);
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(&request.to_payload())
            .send()
            .map_err(|err| {
                WardrobeError::transport_with(format!("request to {endpoint} failed"), err)
            })?;
        response_json_or_error(response)
    }
}

fn response_json_or_error(response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| WardrobeError::transport_with("response body read failed", err))?;
    if !status.is_success() {
        return Err(WardrobeError::transport(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate_text(body.trim(), 512)
        )));
    }
    serde_json::from_str(&body)
        .map_err(|err| WardrobeError::transport_with("service returned invalid JSON", err))
}

/// Offline backend: answers every request with a flat PNG whose colour
/// follows the request text, sized by the requested aspect ratio.
pub struct DryrunBackend;

impl DryrunBackend {
    fn dims_for_ratio(aspect_ratio: &str) -> (u32, u32) {
        const LONG_EDGE: f64 = 256.0;
        let parsed = aspect_ratio
            .split_once(':')
            .and_then(|(w, h)| Some((w.trim().parse::<f64>().ok()?, h.trim().parse::<f64>().ok()?)))
            .filter(|(w, h)| *w > 0.0 && *h > 0.0);
        let Some((w, h)) = parsed else {
            return (LONG_EDGE as u32, LONG_EDGE as u32);
        };
        let scale = LONG_EDGE / w.max(h);
        (
            ((w * scale).round() as u32).max(1),
            ((h * scale).round() as u32).max(1),
        )
    }
}

impl GenerationBackend for DryrunBackend {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_content(&self, request: &GenerationRequest) -> Result<Value> {
        let mut hasher = DefaultHasher::new();
        for text in request.text() {
            text.hash(&mut hasher);
        }
        request.parts.len().hash(&mut hasher);
        let digest = hasher.finish().to_be_bytes();

        let (width, height) = Self::dims_for_ratio(&request.aspect_ratio);
        let image = RgbImage::from_pixel(width, height, Rgb([digest[0], digest[1], digest[2]]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| WardrobeError::transport_with("dryrun image encode failed", err))?;

        let data_url = to_data_url("image/png", &bytes);
        Ok(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": format!("dryrun {width}x{height}") },
                        {
                            "inlineData": {
                                "mimeType": "image/png",
                                "data": extract_base64_payload(&data_url),
                            }
                        }
                    ]
                }
            }]
        }))
    }
}

pub struct GenerationClient {
    backend: Box<dyn GenerationBackend>,
    resolver: AssetResolver,
    model: String,
}

impl GenerationClient {
    pub fn new(
        backend: impl GenerationBackend + 'static,
        resolver: AssetResolver,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend: Box::new(backend),
            resolver,
            model: model.into(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    pub fn generate_clothing_from_text(&self, description: &str) -> Result<String> {
        let request = GenerationRequest {
            model: self.model.clone(),
            parts: vec![ContentPart::Text(clothing_prompt(description))],
            aspect_ratio: CLOTHING_ASPECT_RATIO.to_string(),
        };
        let response = self.backend.generate_content(&request)?;
        extract_first_image(&response).ok_or(WardrobeError::Generation {
            operation: "clothing design",
        })
    }

    pub fn generate_try_on(&self, face_ref: &str, cloth_ref: &str) -> Result<String> {
        let face = self.resolver.resolve_to_inline_data(face_ref)?;
        let cloth = self.resolver.resolve_to_inline_data(cloth_ref)?;

        let request = GenerationRequest {
            model: self.model.clone(),
            parts: vec![
                ContentPart::inline_image(&face),
                ContentPart::inline_image(&cloth),
                ContentPart::Text(TRY_ON_INSTRUCTIONS.to_string()),
            ],
            aspect_ratio: TRY_ON_ASPECT_RATIO.to_string(),
        };
        let response = self.backend.generate_content(&request)?;
        extract_first_image(&response).ok_or(WardrobeError::Generation { operation: "try-on" })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        extract_first_image, ContentPart, DryrunBackend, GeminiBackend, GenerationBackend,
        GenerationClient, GenerationRequest,
    };
    use crate::config::EngineConfig;
    use crate::data_url::decode_data_url;
    use crate::error::WardrobeError;
    use crate::resolver::{default_strategies, AssetResolver, FetchedImage};
    use crate::testing::{image_response, RecordingBackend, ScriptedFetcher};

    const FACE: &str = "data:image/jpeg;base64,RkFDRQ==";
    const CLOTH: &str = "data:image/webp;base64,Q0xPVEg=";

    fn client_with(backend: RecordingBackend, fetcher: ScriptedFetcher) -> GenerationClient {
        let resolver = AssetResolver::new(fetcher, default_strategies(&EngineConfig::default()));
        GenerationClient::new(backend, resolver, "gemini-2.5-flash-image")
    }

    #[test]
    fn try_on_sends_face_cloth_then_instructions() -> anyhow::Result<()> {
        let backend = RecordingBackend::new(vec![Ok(image_response("image/png", "UkVTVUxU"))]);
        let requests = backend.requests();
        let client = client_with(backend, ScriptedFetcher::new(Vec::new()));

        let result = client.generate_try_on(FACE, CLOTH)?;
        assert_eq!(result, "data:image/png;base64,UkVTVUxU");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gemini-2.5-flash-image");
        assert_eq!(request.aspect_ratio, "3:4");
        assert_eq!(request.parts.len(), 3);
        assert_eq!(
            request.parts[0],
            ContentPart::InlineImage {
                data: "RkFDRQ==".to_string(),
                mime_type: "image/jpeg".to_string()
            }
        );
        assert_eq!(
            request.parts[1],
            ContentPart::InlineImage {
                data: "Q0xPVEg=".to_string(),
                mime_type: "image/webp".to_string()
            }
        );
        assert!(matches!(&request.parts[2], ContentPart::Text(text) if text.contains("full-body photo")));
        Ok(())
    }

    #[test]
    fn try_on_resolves_remote_references_first() -> anyhow::Result<()> {
        let backend = RecordingBackend::new(vec![Ok(image_response("image/png", "T0s="))]);
        let requests = backend.requests();
        let fetcher = ScriptedFetcher::new(vec![Ok(FetchedImage {
            bytes: b"abc".to_vec(),
            content_type: Some("image/jpeg".to_string()),
        })]);
        let client = client_with(backend, fetcher);

        client.generate_try_on("https://cdn.example.com/face.jpg", CLOTH)?;
        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[0].parts[0],
            ContentPart::InlineImage {
                data: "YWJj".to_string(),
                mime_type: "image/jpeg".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn try_on_stops_when_a_reference_cannot_be_resolved() {
        let backend = RecordingBackend::new(Vec::new());
        let requests = backend.requests();
        let fetcher = ScriptedFetcher::new(vec![Err(404), Err(404), Err(404)]);
        let client = client_with(backend, fetcher);

        let err = client
            .generate_try_on(FACE, "https://cdn.example.com/cloth.jpg")
            .unwrap_err();
        assert!(matches!(err, WardrobeError::Retrieval { .. }));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[test]
    fn unresolvable_face_aborts_before_cloth_is_fetched() {
        let backend = RecordingBackend::new(Vec::new());
        let requests = backend.requests();
        let fetcher = ScriptedFetcher::new(vec![Err(404), Err(0), Err(502), Ok(FetchedImage {
            bytes: b"cloth".to_vec(),
            content_type: Some("image/jpeg".to_string()),
        })]);
        let calls = fetcher.calls();
        let client = client_with(backend, fetcher);

        let err = client
            .generate_try_on(
                "https://cdn.example.com/face.jpg",
                "https://cdn.example.com/cloth.jpg",
            )
            .unwrap_err();

        match err {
            WardrobeError::Retrieval { reference, .. } => {
                assert_eq!(reference, "https://cdn.example.com/face.jpg");
            }
            other => panic!("unexpected error: {other}"),
        }
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|url| url.contains("face.jpg")));
        assert!(!calls.iter().any(|url| url.contains("cloth.jpg")));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[test]
    fn clothing_request_is_single_square_text_part() -> anyhow::Result<()> {
        let backend = RecordingBackend::new(vec![Ok(image_response("", "Q0w="))]);
        let requests = backend.requests();
        let client = client_with(backend, ScriptedFetcher::new(Vec::new()));

        let result = client.generate_clothing_from_text("  bohemian maxi dress ")?;
        assert_eq!(result, "data:image/png;base64,Q0w=");

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].aspect_ratio, "1:1");
        assert_eq!(requests[0].parts.len(), 1);
        assert!(matches!(
            &requests[0].parts[0],
            ContentPart::Text(text) if text.contains("\"bohemian maxi dress\"") && text.contains("flat-lay")
        ));
        Ok(())
    }

    #[test]
    fn text_only_answers_are_generation_failures() {
        let answer = json!({"candidates": [{"content": {"parts": [{"text": "sorry"}]}}]});
        let backend = RecordingBackend::new(vec![Ok(answer.clone()), Ok(answer)]);
        let client = client_with(backend, ScriptedFetcher::new(Vec::new()));

        let err = client.generate_clothing_from_text("coat").unwrap_err();
        assert!(matches!(err, WardrobeError::Generation { operation: "clothing design" }));
        let err = client.generate_try_on(FACE, CLOTH).unwrap_err();
        assert!(matches!(err, WardrobeError::Generation { operation: "try-on" }));
    }

    #[test]
    fn transport_failures_propagate_unchanged() {
        let backend = RecordingBackend::new(vec![Err(WardrobeError::transport("HTTP 503: busy"))]);
        let client = client_with(backend, ScriptedFetcher::new(Vec::new()));
        let err = client.generate_try_on(FACE, CLOTH).unwrap_err();
        assert!(matches!(err, WardrobeError::Transport { ref message, .. } if message == "HTTP 503: busy"));
    }

    #[test]
    fn extraction_reads_first_candidate_only() {
        let response = json!({
            "candidates": [
                {"content": {"parts": [
                    {"text": "here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": ""}},
                    {"inline_data": {"mime_type": "image/jpeg", "data": "Rmlyc3Q="}},
                    {"inlineData": {"mimeType": "image/png", "data": "U2Vjb25k"}}
                ]}},
                {"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "T3RoZXI="}}]}}
            ]
        });
        assert_eq!(
            extract_first_image(&response).as_deref(),
            Some("data:image/jpeg;base64,Rmlyc3Q=")
        );

        let second_only = json!({
            "candidates": [
                {"content": {"parts": [{"text": "nothing"}]}},
                {"content": {"parts": [{"inlineData": {"data": "T3RoZXI="}}]}}
            ]
        });
        assert_eq!(extract_first_image(&second_only), None);
        assert_eq!(extract_first_image(&json!({})), None);
    }

    #[test]
    fn payload_matches_generate_content_shape() {
        let request = GenerationRequest {
            model: "m".to_string(),
            parts: vec![
                ContentPart::inline_image(FACE),
                ContentPart::Text("hello".to_string()),
            ],
            aspect_ratio: "3:4".to_string(),
        };
        let payload = request.to_payload();
        assert_eq!(payload["contents"][0]["role"], "user");
        assert_eq!(
            payload["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(payload["contents"][0]["parts"][1]["text"], "hello");
        assert_eq!(
            payload["generationConfig"]["imageConfig"]["aspectRatio"],
            "3:4"
        );
    }

    #[test]
    fn gemini_backend_requires_api_key() {
        let backend = GeminiBackend::from_config(&EngineConfig::default());
        let request = GenerationRequest {
            model: "m".to_string(),
            parts: Vec::new(),
            aspect_ratio: "1:1".to_string(),
        };
        assert!(matches!(
            backend.generate_content(&request),
            Err(WardrobeError::MissingApiKey)
        ));
        assert_eq!(
            backend.endpoint_for_model("models/gemini-x"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-x:generateContent"
        );
    }

    #[test]
    fn dryrun_backend_returns_png_sized_by_ratio() -> anyhow::Result<()> {
        let request = GenerationRequest {
            model: "dryrun".to_string(),
            parts: vec![ContentPart::Text("look".to_string())],
            aspect_ratio: "3:4".to_string(),
        };
        let response = DryrunBackend.generate_content(&request)?;
        let url = extract_first_image(&response).expect("dryrun image");
        let (mime, bytes) = decode_data_url(&url)?;
        assert_eq!(mime, "image/png");

        let decoded = image::load_from_memory(&bytes)?;
        assert_eq!((decoded.width(), decoded.height()), (192, 256));
        Ok(())
    }
}
