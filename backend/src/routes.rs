use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::TryStreamExt;
use log::{info, warn};
use shared::{FeedbackRequest, HealthResponse, MessageResponse, PredictionResponse};
use std::path::{Path, PathBuf};

use crate::db::prediction_repository::PredictionRepository;
use crate::error::ApiError;
use crate::inference::diagnosis::Diagnoser;

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone, Copy)]
pub struct UploadLimit {
    pub max_bytes: usize,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: PathBuf) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::Validation(format!("Invalid JSON body: {}", err)).into());

    cfg.app_data(json_config)
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/feedback").route(web::post().to(submit_feedback)))
        .service(web::resource("/predictions/{id}").route(web::get().to(get_prediction)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(Files::new("/static", static_dir));
}

fn has_allowed_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

fn malformed(err: actix_multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("Malformed upload: {}", err))
}

async fn predict(
    diagnoser: web::Data<Diagnoser>,
    repo: web::Data<PredictionRepository>,
    limit: web::Data<UploadLimit>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        if field.name() != Some("file") {
            while field.try_next().await.map_err(malformed)?.is_some() {}
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        if filename.is_empty() {
            return Err(ApiError::Validation("No selected file".into()));
        }
        if !has_allowed_extension(&filename) {
            warn!("Rejected upload with unsupported type: {}", filename);
            return Err(ApiError::Validation(
                "Invalid file type. Only PNG, JPG and JPEG are allowed".into(),
            ));
        }
        if !diagnoser.is_available() {
            return Err(ApiError::ModelUnavailable);
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if image_data.len() + chunk.len() > limit.max_bytes {
                return Err(ApiError::Validation(format!(
                    "File exceeds the {} byte upload limit",
                    limit.max_bytes
                )));
            }
            image_data.extend_from_slice(&chunk);
        }
        upload = Some((filename, image_data));
        break;
    }

    let Some((filename, image_data)) = upload else {
        return Err(ApiError::Validation("No file part in the request".into()));
    };

    let worker = diagnoser.clone();
    let diagnosis = web::block(move || worker.diagnose(&image_data)).await??;

    let store = repo.clone();
    let record = (filename.clone(), diagnosis.disease.clone(), diagnosis.confidence);
    let id = web::block(move || store.record(&record.0, &record.1, record.2)).await??;

    info!(
        "Prediction {} for {}: {} ({:.3})",
        id, filename, diagnosis.disease, diagnosis.confidence
    );

    Ok(HttpResponse::Ok().json(PredictionResponse {
        id,
        predicted_disease: diagnosis.disease,
        confidence: diagnosis.confidence,
        treatment: diagnosis.treatment,
    }))
}

async fn submit_feedback(
    repo: web::Data<PredictionRepository>,
    body: web::Json<FeedbackRequest>,
) -> Result<HttpResponse, ApiError> {
    let FeedbackRequest { id, feedback } = body.into_inner();
    let feedback = feedback.filter(|text| !text.trim().is_empty());
    let (Some(id), Some(feedback)) = (id, feedback) else {
        return Err(ApiError::Validation("Missing prediction id or feedback".into()));
    };

    let store = repo.clone();
    web::block(move || store.attach_feedback(id, &feedback)).await??;
    info!("Feedback attached to prediction {}", id);

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Feedback submitted successfully".into(),
    }))
}

async fn get_prediction(
    repo: web::Data<PredictionRepository>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let store = repo.clone();
    match web::block(move || store.get(id)).await?? {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Err(ApiError::NotFound(format!("Prediction {} not found", id))),
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".into(),
    })
}
