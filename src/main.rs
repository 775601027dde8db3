use anyhow::Context;
use autobook::{
    Config, EnvSecrets, GenerationRequest, LLMClient, Pipeline, PipelineConfig, PipelineError,
    RenderError, TextGenerator, render,
};
use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use http::header;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

const MAX_BOOKS: usize = 5;

#[derive(Clone)]
struct AppState {
    generator: Arc<dyn TextGenerator>,
    pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateForm {
    #[serde(flatten)]
    request: GenerationRequest,
    #[serde(default = "one")]
    books: usize,
}

fn one() -> usize {
    1
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    // A missing credential stops us here, before any generation call
    let config = Config::from_source(&EnvSecrets::load()).context("loading configuration")?;
    let client = LLMClient::new(&config.llm).context("creating LLM client")?;
    tracing::info!(model = client.model(), "using generative text backend");

    let app_state = AppState {
        generator: Arc::new(client),
        pipeline: config.pipeline.clone(),
    };

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/generate", post(generate))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(tower_http::cors::Any)
                        .allow_methods(tower_http::cors::AllowMethods::any())
                        .allow_headers(tower_http::cors::AllowHeaders::any()),
                ),
        )
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateForm>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            tracing::warn!("rejected generate request: {}", rejection.body_text());
            return error_response(
                rejection.status(),
                serde_json::json!({ "error": rejection.body_text() }),
            );
        }
    };

    if !(1..=MAX_BOOKS).contains(&form.books) {
        return error_response(
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": format!("books must be between 1 and {MAX_BOOKS}") }),
        );
    }

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("generate", %request_id, niche = %form.request.niche);

    async move {
        let mut documents = Vec::with_capacity(form.books);
        for book in 1..=form.books {
            let pipeline = Pipeline::new(state.generator.clone(), state.pipeline.clone())
                .with_progress(move |stage| tracing::info!(book, %stage, "progress"));
            match pipeline.run(form.request.clone()).await {
                Ok(document) => documents.push(document),
                Err(e) => return pipeline_error(e),
            }
        }

        let title = documents
            .first()
            .map(|document| render::bundle::slug(&document.title, "ebook"))
            .unwrap_or_else(|| "ebook".to_string());

        // Rendering is CPU-bound
        let bundle = tokio::task::spawn_blocking(move || render::package(&documents)).await;
        match bundle {
            Ok(Ok(bytes)) => {
                tracing::info!(bytes = bytes.len(), "bundle ready");
                (
                    [
                        (header::CONTENT_TYPE, "application/zip".to_string()),
                        (
                            header::CONTENT_DISPOSITION,
                            format!("attachment; filename=\"{title}.zip\""),
                        ),
                    ],
                    bytes,
                )
                    .into_response()
            }
            Ok(Err(e)) => render_error(e),
            Err(e) => {
                tracing::error!("render task panicked: {}", e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "rendering failed" }),
                )
            }
        }
    }
    .instrument(span)
    .await
}

fn pipeline_error(e: PipelineError) -> Response {
    let status = match &e {
        PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PipelineError::Generation(_) | PipelineError::Chapters(_) => StatusCode::BAD_GATEWAY,
    };
    let failed_chapters = match &e {
        PipelineError::Chapters(failures) => failures.indices(),
        _ => Vec::new(),
    };
    let stage = e.stage();
    // `{:#}` prints the whole cause chain
    let message = format!("{:#}", anyhow::Error::new(e));
    tracing::warn!("generation failed: {}", message);
    error_response(
        status,
        serde_json::json!({
            "error": message,
            "stage": stage,
            "failed_chapters": failed_chapters,
        }),
    )
}

fn render_error(e: RenderError) -> Response {
    tracing::error!("rendering failed: {}", e);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({ "error": e.to_string() }),
    )
}

fn error_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

const INDEX_PAGE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>AutoBook - AI Book Factory</title>
    <meta charset="utf-8">
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; max-width: 640px; }
        label { display: block; margin-top: 16px; font-weight: bold; }
        input, select { width: 100%; padding: 8px; margin-top: 4px; }
        .add-ons label { font-weight: normal; }
        .add-ons input { width: auto; }
        button { margin-top: 24px; padding: 12px 24px; font-size: 1em; }
        #status { margin-top: 16px; color: #555; }
    </style>
</head>
<body>
    <h1>AutoBook - AI Book Factory</h1>
    <p>Generate ready-to-sell ebooks, sales pages, ad hooks and cover prompts in one click.</p>

    <form id="form">
        <label>Niche <input name="niche" value="Spiritual Awakening & Energy Vibration" required></label>
        <label>Target audience <input name="target_audience" value="beginners"></label>
        <label>Book type <input name="book_type" value="Guide"></label>
        <label>Chapters <input name="chapter_count" type="number" min="1" max="20" value="5"></label>
        <label>Number of books <input name="books" type="number" min="1" max="5" value="1"></label>
        <div class="add-ons">
            <label>Add-ons</label>
            <label><input type="checkbox" name="add_ons" value="workbook"> Companion Workbook</label>
            <label><input type="checkbox" name="add_ons" value="checklist"> Quick-Start Checklist</label>
            <label><input type="checkbox" name="add_ons" value="templates"> Done-For-You Templates</label>
            <label><input type="checkbox" name="add_ons" value="audio_script"> Audio Companion Script</label>
            <label><input type="checkbox" name="add_ons" value="email_swipe_file"> Email Swipe File</label>
            <label><input type="checkbox" name="add_ons" value="resource_guide"> Resource Guide</label>
        </div>
        <button type="submit">Generate products</button>
    </form>
    <div id="status"></div>

    <script>
    document.getElementById("form").addEventListener("submit", async (event) => {
        event.preventDefault();
        const data = new FormData(event.target);
        const body = {
            niche: data.get("niche"),
            target_audience: data.get("target_audience"),
            book_type: data.get("book_type"),
            chapter_count: Number(data.get("chapter_count")),
            books: Number(data.get("books")),
            add_ons: data.getAll("add_ons"),
        };
        const status = document.getElementById("status");
        status.textContent = "Generating... this can take a few minutes.";
        const response = await fetch("/generate", {
            method: "POST",
            headers: { "Content-Type": "application/json" },
            body: JSON.stringify(body),
        });
        if (!response.ok) {
            const error = await response.json();
            status.textContent = "Failed: " + error.error;
            return;
        }
        const blob = await response.blob();
        const link = document.createElement("a");
        link.href = URL.createObjectURL(blob);
        link.download = "ebooks.zip";
        link.click();
        status.textContent = "Done! Your bundle is downloading.";
    });
    </script>
</body>
</html>
"#;
