//! In-memory stand-in for the study app backend.
//!
//! Serves a slice of the real API under `/api` with the same envelope and
//! bearer-token conventions: sessions are issued by the two login endpoints,
//! protected routes answer HTTP 401 for unknown tokens, and business failures
//! come back as HTTP 200 with a non-200 envelope code.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

const UPLOAD_CATEGORIES: [&str; 4] = ["video", "document", "image", "cover"];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u64,
    pub subject: String,
    pub content: String,
    /// `"A.foo;B.bar"` style option list.
    pub options: String,
    pub answer: String,
}

#[derive(Deserialize)]
struct AdminLogin {
    username: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WechatLogin {
    #[serde(default)]
    code: String,
    nick_name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    subject: Option<String>,
    #[serde(default = "first_page")]
    page_num: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

fn first_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

#[derive(Default)]
pub struct AppState {
    /// token -> user profile
    sessions: RwLock<HashMap<String, Value>>,
    questions: Vec<Question>,
}

pub type Db = Arc<AppState>;

pub fn app() -> Router {
    let state: Db = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        questions: seed_questions(),
    });
    let api = Router::new()
        .route("/admin/login", post(admin_login))
        .route("/admin/logout", post(admin_logout))
        .route("/user/wechat-login", post(wechat_login))
        .route("/user/info", get(user_info))
        .route("/question/list", get(list_questions))
        .route("/question/{id}/answer", post(submit_answer))
        .route("/plan/recommend", post(recommend_plan))
        .route("/file/upload/{category}", post(upload_file))
        .route("/broken", get(broken))
        .with_state(state);
    Router::new().nest("/api", api).layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn seed_questions() -> Vec<Question> {
    [
        (1, "math", "1 + 1 = ?", "A.2;B.3;C.4", "A"),
        (2, "math", "2 * 3 = ?", "A.5;B.6;C.8", "B"),
        (3, "english", "Pick the noun", "A.run;B.quickly;C.table", "C"),
    ]
    .into_iter()
    .map(|(id, subject, content, options, answer)| Question {
        id,
        subject: subject.to_string(),
        content: content.to_string(),
        options: options.to_string(),
        answer: answer.to_string(),
    })
    .collect()
}

fn ok(data: impl Serialize) -> Json<Value> {
    Json(json!({ "code": 200, "message": "success", "data": data }))
}

fn fail(code: u16, message: &str) -> Json<Value> {
    Json(json!({ "code": code, "message": message, "data": null }))
}

async fn authorize(db: &AppState, headers: &HeaderMap) -> Result<(String, Value), StatusCode> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let sessions = db.sessions.read().await;
    sessions
        .get(token)
        .cloned()
        .map(|user| (token.to_string(), user))
        .ok_or(StatusCode::UNAUTHORIZED)
}

async fn issue_session(db: &AppState, user: Value) -> Value {
    let token = Uuid::new_v4().simple().to_string();
    db.sessions.write().await.insert(token.clone(), user.clone());
    json!({ "token": token, "user": user })
}

/// Merge a JSON object body with query parameters; query wins.
fn request_params(query: HashMap<String, String>, body: &Bytes) -> HashMap<String, Value> {
    let mut params: HashMap<String, Value> = if body.is_empty() {
        HashMap::new()
    } else {
        serde_json::from_slice(body).unwrap_or_default()
    };
    params.extend(query.into_iter().map(|(k, v)| (k, Value::String(v))));
    params
}

fn param_str(params: &HashMap<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn admin_login(State(db): State<Db>, Json(input): Json<AdminLogin>) -> Json<Value> {
    if input.username != ADMIN_USERNAME || input.password != ADMIN_PASSWORD {
        return fail(500, "Login failed: invalid username or password");
    }
    let user = json!({ "id": 1, "username": input.username, "role": "ADMIN" });
    ok(issue_session(&db, user).await)
}

async fn admin_logout(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let (token, _) = authorize(&db, &headers).await?;
    db.sessions.write().await.remove(&token);
    Ok(ok(Value::Null))
}

async fn wechat_login(State(db): State<Db>, Json(input): Json<WechatLogin>) -> Json<Value> {
    if input.code.is_empty() {
        return fail(400, "code is required");
    }
    let user = json!({
        "id": 2,
        "nickName": input.nick_name.unwrap_or_else(|| "student".to_string()),
        "avatarUrl": input.avatar_url,
        "role": "USER",
    });
    ok(issue_session(&db, user).await)
}

async fn user_info(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let (_, user) = authorize(&db, &headers).await?;
    Ok(ok(user))
}

async fn list_questions(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let matching: Vec<&Question> = db
        .questions
        .iter()
        .filter(|q| query.subject.as_deref().map_or(true, |s| q.subject == s))
        .collect();
    let page_size = query.page_size.max(1);
    let skip = query.page_num.saturating_sub(1) * page_size;
    let records: Vec<&Question> = matching.iter().copied().skip(skip).take(page_size).collect();
    Ok(ok(json!({
        "records": records,
        "total": matching.len(),
        "pageNum": query.page_num,
        "pageSize": page_size,
    })))
}

async fn submit_answer(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let Some(question) = db.questions.iter().find(|q| q.id == id) else {
        return Ok(fail(404, "question not found"));
    };
    let params = request_params(query, &body);
    let Some(answer) = param_str(&params, "answer") else {
        return Ok(fail(400, "answer is required"));
    };
    Ok(ok(json!({
        "questionId": id,
        "answer": answer,
        "correct": answer.eq_ignore_ascii_case(&question.answer),
        "timeSpent": param_str(&params, "timeSpent").and_then(|t| t.parse::<u32>().ok()),
    })))
}

async fn recommend_plan(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let params = request_params(query, &body);
    let fields = ["targetUniversity", "targetMajor", "examDate"].map(|k| param_str(&params, k));
    let [Some(university), Some(major), Some(exam_date)] = fields else {
        return Ok(fail(400, "targetUniversity, targetMajor and examDate are required"));
    };
    Ok(ok(json!({
        "title": format!("{university} {major} plan"),
        "targetUniversity": university,
        "targetMajor": major,
        "examDate": exam_date,
        "status": "ACTIVE",
    })))
}

async fn upload_file(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(category): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    if !UPLOAD_CATEGORIES.contains(&category.as_str()) {
        return Err(StatusCode::NOT_FOUND);
    }
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        return Ok(ok(json!({
            "url": format!("https://cdn.example.com/{category}/{}-{file_name}", Uuid::new_v4().simple()),
            "fileName": file_name,
            "contentType": content_type,
            "size": bytes.len(),
        })));
    }
    Ok(fail(400, "file is required"))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::OK, "<html>gateway hiccup</html>")
}
