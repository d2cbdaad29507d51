//! Boundary to the remote inference service: the two wizard submissions,
//! the archive listing and the result-bundle download.
//!
//! The backend does not always set a conventional success status, so the
//! loose success heuristic for uploads lives in exactly one place
//! (`upload_accepted`) and is never re-implemented at call sites. Errors
//! returned from here are the user-displayable messages the shell shows
//! verbatim; transport details are logged, not surfaced.

use crate::features::archive::ArchiveEntry;
use crate::features::intake::Artifact;
use crate::features::viewer::AnalysisResult;
use serde_json::Value;

pub const UPLOAD_FAILED_MSG: &str = "Upload failed. Please try again.";
pub const NETWORK_ERROR_MSG: &str = "Network error. Please check your connection and try again.";
pub const PROCESSING_FAILED_MSG: &str = "Processing failed. Please try again.";
pub const DOWNLOAD_FAILED_MSG: &str = "Download failed. Please try again.";
pub const ARCHIVE_FAILED_MSG: &str = "Failed to fetch data";

/// Transport-level view of a response: whether the status code was a
/// success, and the body when it parsed as JSON.
pub struct WireResponse {
    pub ok: bool,
    pub body: Option<Value>,
}

fn endpoint(api_base: &str, path: &str) -> String {
    format!("{}{}", api_base.trim_end_matches('/'), path)
}

/// Upload success is any of: transport-level success, a `status` field that
/// case-insensitively equals "success", or a `message` field that
/// case-insensitively contains "success".
pub fn upload_accepted(response: &WireResponse) -> bool {
    if response.ok {
        return true;
    }
    let Some(body) = &response.body else {
        return false;
    };
    let status_success = body
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.eq_ignore_ascii_case("success"))
        .unwrap_or(false);
    let message_success = body
        .get("message")
        .and_then(Value::as_str)
        .map(|m| m.to_lowercase().contains("success"))
        .unwrap_or(false);
    status_success || message_success
}

/// Prefer the message supplied by the remote response; fall back to the
/// generic upload-failure message.
pub fn upload_failure_message(body: Option<&Value>) -> String {
    body.and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| UPLOAD_FAILED_MSG.to_string())
}

pub fn parse_analysis_response(body: &Value) -> AnalysisResult {
    let results = body.get("results");
    let image = |key: &str| -> String {
        results
            .and_then(|r| r.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    AnalysisResult {
        classification: body
            .get("classification")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .unwrap_or("Unknown")
            .to_string(),
        original_image: image("originalImage"),
        heatmap_image: image("heatmapImage"),
        mask_image: image("maskImage"),
        table_image: image("tableImage"),
    }
}

pub fn parse_archive_entries(body: &Value) -> Result<Vec<ArchiveEntry>, String> {
    let Some(items) = body.as_array() else {
        return Err(ARCHIVE_FAILED_MSG.to_string());
    };
    Ok(items.iter().map(parse_archive_entry).collect())
}

fn parse_archive_entry(item: &Value) -> ArchiveEntry {
    // Ids arrive as numbers or strings depending on the backend's mood.
    let text = |value: Option<&Value>| -> String {
        match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    };
    let images = item.get("images");
    let image = |key: &str| -> String {
        images
            .and_then(|i| i.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let classification = text(item.get("classification"));
    ArchiveEntry {
        id: text(item.get("id")),
        magnification: text(item.get("magnification")),
        classification: if classification.is_empty() {
            "Unclassified".to_string()
        } else {
            classification
        },
        original_image: image("originalImage"),
        heatmap_image: image("heatmapImage"),
        table_image: image("tableImage"),
    }
}

/// Transmit the artifact as a multipart payload. Transport failures become
/// the generic network message; a rejected upload carries the remote
/// message when one was supplied.
pub async fn submit_artifact(api_base: &str, artifact: &Artifact) -> Result<(), String> {
    let response = send_upload(api_base, artifact).await.map_err(|e| {
        crate::console_error(&format!("upload transport failed: {e}"));
        NETWORK_ERROR_MSG.to_string()
    })?;
    if upload_accepted(&response) {
        Ok(())
    } else {
        Err(upload_failure_message(response.body.as_ref()))
    }
}

/// Transmit the chosen parameters. Any transport or parse failure collapses
/// into the generic processing message; a JSON body is normalized even when
/// the status code was not a success.
pub async fn submit_parameters(
    api_base: &str,
    model: &str,
    xai_method: &str,
    magval: &str,
) -> Result<AnalysisResult, String> {
    let response = send_inputform(api_base, model, xai_method, magval)
        .await
        .map_err(|e| {
            crate::console_error(&format!("inputform transport failed: {e}"));
            PROCESSING_FAILED_MSG.to_string()
        })?;
    let body = response
        .body
        .ok_or_else(|| PROCESSING_FAILED_MSG.to_string())?;
    Ok(parse_analysis_response(&body))
}

pub async fn fetch_archive(api_base: &str) -> Result<Vec<ArchiveEntry>, String> {
    let response = send_oldpreds(api_base).await?;
    if !response.ok {
        return Err(ARCHIVE_FAILED_MSG.to_string());
    }
    let body = response
        .body
        .ok_or_else(|| ARCHIVE_FAILED_MSG.to_string())?;
    parse_archive_entries(&body)
}

pub async fn download_bundle(api_base: &str) -> Result<Vec<u8>, String> {
    send_zip(api_base).await.map_err(|e| {
        crate::console_error(&format!("bundle download failed: {e}"));
        DOWNLOAD_FAILED_MSG.to_string()
    })
}

#[cfg(not(test))]
async fn finish_json(response: reqwest::Response) -> WireResponse {
    let ok = response.status().is_success();
    let body = response.json::<Value>().await.ok();
    WireResponse { ok, body }
}

#[cfg(not(test))]
async fn send_upload(api_base: &str, artifact: &Artifact) -> Result<WireResponse, String> {
    let mut part = reqwest::multipart::Part::bytes(artifact.content.clone())
        .file_name(artifact.name.clone());
    if !artifact.media_type.is_empty() {
        part = part
            .mime_str(&artifact.media_type)
            .map_err(|e| format!("invalid_media_type:{e}"))?;
    }
    let form = reqwest::multipart::Form::new().part("file", part);
    let response = reqwest::Client::new()
        .post(endpoint(api_base, "/api/upload"))
        .multipart(form)
        .send()
        .await
        .map_err(|e| format!("request_failed:{e}"))?;
    Ok(finish_json(response).await)
}

#[cfg(not(test))]
async fn send_inputform(
    api_base: &str,
    model: &str,
    xai_method: &str,
    magval: &str,
) -> Result<WireResponse, String> {
    let response = reqwest::Client::new()
        .post(endpoint(api_base, "/api/inputform"))
        .json(&serde_json::json!({
            "model": model,
            "xaiMethod": xai_method,
            "magval": magval,
        }))
        .send()
        .await
        .map_err(|e| format!("request_failed:{e}"))?;
    Ok(finish_json(response).await)
}

#[cfg(not(test))]
async fn send_oldpreds(api_base: &str) -> Result<WireResponse, String> {
    let response = reqwest::Client::new()
        .get(endpoint(api_base, "/api/oldpreds"))
        .send()
        .await
        .map_err(|e| format!("request_failed:{e}"))?;
    Ok(finish_json(response).await)
}

#[cfg(not(test))]
async fn send_zip(api_base: &str) -> Result<Vec<u8>, String> {
    let response = reqwest::Client::new()
        .get(endpoint(api_base, "/api/zip"))
        .send()
        .await
        .map_err(|e| format!("request_failed:{e}"))?;
    if !response.status().is_success() {
        return Err(format!("bad_status:{}", response.status()));
    }
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| format!("body_read_failed:{e}"))
}


#[cfg(test)]
async fn scripted_json() -> Result<WireResponse, String> {
    match testing::next() {
        Some(testing::ScriptedResponse::Http { ok, body }) => Ok(WireResponse {
            ok,
            body: body.and_then(|b| serde_json::from_str(&b).ok()),
        }),
        Some(testing::ScriptedResponse::TransportFailure) => {
            Err("request_failed:connection refused".to_string())
        }
        Some(testing::ScriptedResponse::Bytes(_)) | None => {
            Err("request_failed:no scripted response".to_string())
        }
    }
}

#[cfg(test)]
async fn send_upload(_api_base: &str, _artifact: &Artifact) -> Result<WireResponse, String> {
    scripted_json().await
}

#[cfg(test)]
async fn send_inputform(
    _api_base: &str,
    _model: &str,
    _xai_method: &str,
    _magval: &str,
) -> Result<WireResponse, String> {
    scripted_json().await
}

#[cfg(test)]
async fn send_oldpreds(_api_base: &str) -> Result<WireResponse, String> {
    scripted_json().await
}

#[cfg(test)]
async fn send_zip(_api_base: &str) -> Result<Vec<u8>, String> {
    match testing::next() {
        Some(testing::ScriptedResponse::Bytes(bytes)) => Ok(bytes),
        Some(testing::ScriptedResponse::TransportFailure) => {
            Err("request_failed:connection refused".to_string())
        }
        _ => Err("request_failed:no scripted response".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn wire(ok: bool, body: Option<&str>) -> WireResponse {
        WireResponse {
            ok,
            body: body.map(|b| serde_json::from_str(b).expect("test body should be JSON")),
        }
    }

    fn artifact() -> Artifact {
        Artifact {
            name: "cell.png".to_string(),
            size: 3,
            media_type: "image/png".to_string(),
            content: vec![1, 2, 3],
            preview: None,
        }
    }

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        crate::session::test_env_lock()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn upload_success_tri_condition() {
        // Transport-level success alone is enough.
        assert!(upload_accepted(&wire(true, None)));
        // A status field equal to "success", case-insensitively.
        assert!(upload_accepted(&wire(false, Some(r#"{"status":"SUCCESS"}"#))));
        // A message that merely contains "success".
        assert!(upload_accepted(&wire(
            false,
            Some(r#"{"message":"File uploaded successfully"}"#)
        )));
        // Anything else is a failure.
        assert!(!upload_accepted(&wire(false, None)));
        assert!(!upload_accepted(&wire(
            false,
            Some(r#"{"status":"error","message":"corrupt file"}"#)
        )));
    }

    #[test]
    fn upload_failure_prefers_the_remote_message() {
        let body: Value = serde_json::from_str(r#"{"status":"error","message":"corrupt file"}"#).unwrap();
        assert_eq!(upload_failure_message(Some(&body)), "corrupt file");
        assert_eq!(upload_failure_message(None), UPLOAD_FAILED_MSG);
        let no_message: Value = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert_eq!(upload_failure_message(Some(&no_message)), UPLOAD_FAILED_MSG);
    }

    #[test]
    fn analysis_response_defaults_classification_to_unknown() {
        let body: Value = serde_json::from_str(
            r#"{"results":{"originalImage":"o","heatmapImage":"h","maskImage":"m","tableImage":"t"}}"#,
        )
        .unwrap();
        let result = parse_analysis_response(&body);
        assert_eq!(result.classification, "Unknown");
        assert_eq!(result.original_image, "o");
        assert_eq!(result.heatmap_image, "h");
        assert_eq!(result.mask_image, "m");
        assert_eq!(result.table_image, "t");

        let empty: Value = serde_json::from_str(r#"{"classification":""}"#).unwrap();
        let result = parse_analysis_response(&empty);
        assert_eq!(result.classification, "Unknown");
        assert!(!result.has_primary_image());
    }

    #[test]
    fn archive_entries_normalize_ids_and_missing_classifications() {
        let body: Value = serde_json::from_str(
            r#"[
                {"id": 7, "magnification": "0.4", "classification": "Abnormal",
                 "images": {"originalImage": "o", "heatmapImage": "h", "tableImage": "t"}},
                {"id": "run-2", "magnification": 40}
            ]"#,
        )
        .unwrap();
        let entries = parse_archive_entries(&body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "7");
        assert_eq!(entries[0].classification, "Abnormal");
        assert_eq!(entries[0].original_image, "o");
        assert_eq!(entries[1].id, "run-2");
        assert_eq!(entries[1].magnification, "40");
        assert_eq!(entries[1].classification, "Unclassified");
        assert_eq!(entries[1].original_image, "");

        let not_a_list: Value = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert_eq!(
            parse_archive_entries(&not_a_list).unwrap_err(),
            ARCHIVE_FAILED_MSG
        );
    }

    #[test]
    fn transport_failure_maps_to_the_network_message() {
        let _guard = lock();
        testing::clear_script();
        testing::script_transport_failure();
        let err = block_on(submit_artifact("", &artifact())).unwrap_err();
        assert_eq!(err, NETWORK_ERROR_MSG);
    }

    #[test]
    fn rejected_upload_carries_the_remote_message() {
        let _guard = lock();
        testing::clear_script();
        testing::script_http(false, Some(r#"{"status":"error","message":"corrupt file"}"#));
        let err = block_on(submit_artifact("", &artifact())).unwrap_err();
        assert_eq!(err, "corrupt file");
    }

    #[test]
    fn parameters_submission_parses_even_non_ok_json_bodies() {
        let _guard = lock();
        testing::clear_script();
        testing::script_http(
            false,
            Some(r#"{"classification":"Malignant","results":{"originalImage":"o"}}"#),
        );
        let result = block_on(submit_parameters("", "vgg16", "LRP", "0.4")).unwrap();
        assert_eq!(result.classification, "Malignant");
        assert!(result.has_primary_image());
    }

    #[test]
    fn parameters_submission_without_json_body_is_a_processing_failure() {
        let _guard = lock();
        testing::clear_script();
        testing::script_http(true, None);
        let err = block_on(submit_parameters("", "vgg16", "LRP", "0.4")).unwrap_err();
        assert_eq!(err, PROCESSING_FAILED_MSG);
    }

    #[test]
    fn archive_fetch_error_states() {
        let _guard = lock();
        testing::clear_script();
        testing::script_http(false, None);
        assert_eq!(block_on(fetch_archive("")).unwrap_err(), ARCHIVE_FAILED_MSG);

        testing::script_http(true, Some(r#"[]"#));
        assert_eq!(block_on(fetch_archive("")).unwrap(), Vec::new());
    }

    #[test]
    fn bundle_download_maps_failures_to_the_download_message() {
        let _guard = lock();
        testing::clear_script();
        testing::script_transport_failure();
        assert_eq!(
            block_on(download_bundle("")).unwrap_err(),
            DOWNLOAD_FAILED_MSG
        );

        testing::script_bytes(vec![0x50, 0x4b]);
        assert_eq!(block_on(download_bundle("")).unwrap(), vec![0x50, 0x4b]);
    }

    #[test]
    fn endpoints_join_without_doubled_slashes() {
        assert_eq!(endpoint("http://api", "/api/zip"), "http://api/api/zip");
        assert_eq!(endpoint("http://api/", "/api/zip"), "http://api/api/zip");
        assert_eq!(endpoint("", "/api/zip"), "/api/zip");
    }
}
