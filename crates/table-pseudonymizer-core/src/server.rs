//! HTTP boundary: JSON and file-upload pseudonymization endpoints

use std::sync::{Mutex, PoisonError};

use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::middleware::Logger;
use actix_web::{get, post, web, App, HttpResponse, HttpServer};
use anyhow::Result;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::anonymizer::FieldAnonymizer;
use crate::config::{Config, UploadConfig};
use crate::error::{PseudonymizeError, PseudonymizeResult};
use crate::faker::{FakerEngine, SyntheticSource};
use crate::ingest::{read_table, FileFormat};
use crate::table::Table;

pub struct AppState {
    anonymizer: FieldAnonymizer,
    source: Mutex<Box<dyn SyntheticSource>>,
    upload: UploadConfig,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_source(config.upload.clone(), Box::new(FakerEngine::new(&config.faker)))
    }

    pub fn with_source(upload_config: UploadConfig, source: Box<dyn SyntheticSource>) -> Result<Self> {
        Ok(Self {
            anonymizer: FieldAnonymizer::new()?,
            source: Mutex::new(source),
            upload: upload_config,
        })
    }

    pub fn pseudonymize(&self, table: &Table) -> Table {
        // The generator carries no invariants a panicking holder could break.
        let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        self.anonymizer.pseudonymize_table(table, &mut **source)
    }
}

#[derive(Debug, Deserialize)]
pub struct AnonymizeRequest {
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct PseudonymizedResponse {
    pub pseudonymized_data: Table,
}

struct UploadedFile {
    filename: String,
    format: FileFormat,
    bytes: Vec<u8>,
}

#[post("/anonymize")]
async fn anonymize(
    state: web::Data<AppState>,
    body: web::Json<AnonymizeRequest>,
) -> PseudonymizeResult<HttpResponse> {
    let table = Table::from_json_data(body.data.as_ref())
        .inspect_err(|e| warn!("Rejected JSON payload: {}", e))?;

    let pseudonymized = state.pseudonymize(&table);
    info!("Pseudonymized {} rows from JSON payload", pseudonymized.len());

    Ok(HttpResponse::Ok().json(PseudonymizedResponse {
        pseudonymized_data: pseudonymized,
    }))
}

#[post("/upload")]
async fn upload(state: web::Data<AppState>, payload: Multipart) -> PseudonymizeResult<HttpResponse> {
    let table = load_upload(&state.upload, payload)
        .await
        .inspect_err(|e| warn!("Rejected upload: {}", e))?;

    let pseudonymized = state.pseudonymize(&table);
    info!("Pseudonymized {} rows from uploaded file", pseudonymized.len());

    Ok(HttpResponse::Ok().json(PseudonymizedResponse {
        pseudonymized_data: pseudonymized,
    }))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn load_upload(upload_config: &UploadConfig, mut payload: Multipart) -> PseudonymizeResult<Table> {
    let file = read_file_part(&mut payload, upload_config.max_file_bytes)
        .await?
        .ok_or(PseudonymizeError::NoFilePart)?;

    info!("Received '{}' ({} bytes)", file.filename, file.bytes.len());
    read_table(file.format, file.bytes, upload_config.excel_sheet.as_deref())
}

/// Finds the `file` part and buffers it. Name and extension are checked from
/// the part headers before any of the body is read.
async fn read_file_part(
    payload: &mut Multipart,
    max_bytes: usize,
) -> PseudonymizeResult<Option<UploadedFile>> {
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let filename = match field.content_disposition() {
            Some(cd) if cd.get_name() == Some("file") => cd.get_filename().map(str::to_string),
            _ => None,
        };
        // Parts without a filename are plain form fields.
        let Some(filename) = filename else {
            debug!("Skipping multipart field without a file");
            continue;
        };

        if filename.is_empty() {
            return Err(PseudonymizeError::NoSelectedFile);
        }
        let format = FileFormat::from_filename(&filename).ok_or(PseudonymizeError::UnsupportedFileType)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(PseudonymizeError::FileTooLarge { limit: max_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Some(UploadedFile { filename, format, bytes }));
    }

    Ok(None)
}

fn multipart_error(err: actix_multipart::MultipartError) -> PseudonymizeError {
    PseudonymizeError::Multipart(err.to_string())
}

/// Registers the routes and the JSON extractor settings on an app.
pub fn configure(cfg: &mut web::ServiceConfig, json_limit_bytes: usize) {
    let json_config = web::JsonConfig::default()
        .limit(json_limit_bytes)
        .error_handler(|err, _req| PseudonymizeError::Json(err.to_string()).into());

    cfg.app_data(json_config)
        .service(anonymize)
        .service(upload)
        .service(health);
}

pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

pub async fn run(config: Config) -> Result<()> {
    let state = web::Data::new(AppState::new(&config)?);
    let json_limit = config.server.json_limit_bytes;
    let (host, port) = config.bind_address();

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(|cfg| configure(cfg, json_limit))
            .wrap(cors())
            .wrap(Logger::default())
    });

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    info!("Listening on http://{}:{}", host, port);
    server
        .bind((host.as_str(), port))
        .map_err(|e| anyhow::anyhow!("Failed to bind {}:{}: {}", host, port, e))?
        .run()
        .await?;

    info!("Server stopped");
    Ok(())
}
