//! Descriptors for the study API surface used by the mini-program and the
//! admin dashboard.
//!
//! Functions only describe calls; run them with `RequestClient::send`,
//! `send_as`, or `sign_in` for the two login endpoints.

use serde::Serialize;

use crate::descriptor::{PayloadEncoding, RequestDescriptor};
use crate::error::RequestError;

/// Page cursor accepted by every list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_num: u32,
    pub page_size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: 10,
        }
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WechatLogin {
        pub code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub nick_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub avatar_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub gender: Option<String>,
    }

    pub fn wechat_login(login: &WechatLogin) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/user/wechat-login").public().json(login)
    }

    pub fn info() -> RequestDescriptor {
        RequestDescriptor::get("/user/info")
    }

    pub fn update_info(profile: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::put("/user/info").json(profile)
    }

    pub fn dashboard() -> RequestDescriptor {
        RequestDescriptor::get("/user/dashboard")
    }
}

pub mod admin {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    pub struct AdminLogin<'a> {
        pub username: &'a str,
        pub password: &'a str,
    }

    pub fn login(username: &str, password: &str) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/admin/login")
            .public()
            .json(AdminLogin { username, password })
    }

    pub fn logout() -> RequestDescriptor {
        RequestDescriptor::post("/admin/logout")
    }

    pub fn statistics() -> RequestDescriptor {
        RequestDescriptor::get("/admin/statistics")
    }

    pub fn users(filter: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/admin/users").query(filter)
    }

    pub fn update_user(id: u64, data: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::put(format!("/admin/users/{id}")).json(data)
    }

    pub fn delete_user(id: u64) -> RequestDescriptor {
        RequestDescriptor::delete(format!("/admin/users/{id}"))
    }

    pub fn resources(filter: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/admin/resources").query(filter)
    }

    pub fn delete_resource(id: u64) -> RequestDescriptor {
        RequestDescriptor::delete(format!("/admin/resource/{id}"))
    }

    pub fn questions(filter: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/admin/questions").query(filter)
    }

    pub fn delete_question(id: u64) -> RequestDescriptor {
        RequestDescriptor::delete(format!("/admin/question/{id}"))
    }

    pub fn posts(filter: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/admin/posts").query(filter)
    }

    pub fn delete_post(id: u64) -> RequestDescriptor {
        RequestDescriptor::delete(format!("/admin/post/{id}"))
    }
}

pub mod resource {
    use super::*;

    pub fn create(data: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/resource").json(data)
    }

    /// Filter fields (`subject`, `type`, `pageNum`, `pageSize`) go to the query.
    pub fn list(filter: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/resource/list").query(filter)
    }

    pub fn detail(id: u64) -> RequestDescriptor {
        RequestDescriptor::get(format!("/resource/{id}"))
    }

    pub fn by_chapter(subject: &str, chapter: &str) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/resource/chapter").query(serde_json::json!({
            "subject": subject,
            "chapter": chapter,
        }))
    }

    pub fn update(id: u64, data: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::put(format!("/resource/{id}")).json(data)
    }

    pub fn delete(id: u64) -> RequestDescriptor {
        RequestDescriptor::delete(format!("/resource/{id}"))
    }
}

pub mod question {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Answer<'a> {
        pub answer: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub time_spent: Option<u32>,
    }

    pub fn create(data: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/question").json(data)
    }

    pub fn list(filter: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/question/list").query(filter)
    }

    pub fn detail(id: u64) -> RequestDescriptor {
        RequestDescriptor::get(format!("/question/{id}"))
    }

    /// The backend has been seen reading the answer both from request
    /// parameters and from a JSON body; `encoding` selects which.
    pub fn submit_answer(
        id: u64,
        answer: &Answer<'_>,
        encoding: PayloadEncoding,
    ) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post(format!("/question/{id}/answer")).encoded(answer, encoding)
    }

    /// `None` lists every wrong question regardless of mastery.
    pub fn wrong(mastered: Option<bool>) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/question/wrong").query(serde_json::json!({ "mastered": mastered }))
    }

    pub fn mark_mastered(question_id: u64) -> RequestDescriptor {
        RequestDescriptor::post(format!("/question/wrong/{question_id}/master"))
    }

    pub fn smart_practice(subject: &str, count: u32) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/question/smart-practice").query(serde_json::json!({
            "subject": subject,
            "count": count,
        }))
    }
}

pub mod plan {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Recommend<'a> {
        pub target_university: &'a str,
        pub target_major: &'a str,
        /// `YYYY-MM-DD`.
        pub exam_date: &'a str,
    }

    pub fn create(data: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/plan").json(data)
    }

    /// Same payload-style ambiguity as `question::submit_answer`.
    pub fn recommend(params: &Recommend<'_>, encoding: PayloadEncoding) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/plan/recommend").encoded(params, encoding)
    }

    pub fn mine() -> RequestDescriptor {
        RequestDescriptor::get("/plan/my")
    }

    pub fn active() -> RequestDescriptor {
        RequestDescriptor::get("/plan/active")
    }

    pub fn detail(id: u64) -> RequestDescriptor {
        RequestDescriptor::get(format!("/plan/{id}"))
    }

    pub fn today(plan_id: u64) -> RequestDescriptor {
        RequestDescriptor::get(format!("/plan/{plan_id}/today"))
    }

    pub fn complete_item(item_id: u64, actual_hours: f64) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post(format!("/plan/item/{item_id}/complete"))
            .query(serde_json::json!({ "actualHours": actual_hours }))
    }
}

pub mod community {
    use super::*;

    pub fn create_post(data: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/community/post").json(data)
    }

    pub fn posts(filter: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/community/post/list").query(filter)
    }

    pub fn my_posts(page: Page) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::get("/community/post/my").query(page)
    }

    pub fn pinned_posts() -> RequestDescriptor {
        RequestDescriptor::get("/community/post/pinned")
    }

    pub fn post_detail(id: u64) -> RequestDescriptor {
        RequestDescriptor::get(format!("/community/post/{id}"))
    }

    pub fn like_post(id: u64) -> RequestDescriptor {
        RequestDescriptor::post(format!("/community/post/{id}/like"))
    }

    pub fn add_comment(data: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/community/comment").json(data)
    }

    pub fn comments(post_id: u64) -> RequestDescriptor {
        RequestDescriptor::get(format!("/community/comment/{post_id}"))
    }

    pub fn check_in(data: impl Serialize) -> Result<RequestDescriptor, RequestError> {
        RequestDescriptor::post("/community/checkin").json(data)
    }

    pub fn check_in_records() -> RequestDescriptor {
        RequestDescriptor::get("/community/checkin/records")
    }

    pub fn continuous_days() -> RequestDescriptor {
        RequestDescriptor::get("/community/checkin/continuous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Payload;
    use crate::http::HttpMethod;
    use serde_json::json;

    #[test]
    fn login_endpoints_are_public() {
        let d = admin::login("admin", "secret").unwrap();
        assert_eq!(d.method(), HttpMethod::Post);
        assert_eq!(d.url(), "/admin/login");
        assert!(!d.requires_auth());

        let d = user::wechat_login(&user::WechatLogin {
            code: "wx-code".to_string(),
            nick_name: Some("n".to_string()),
            avatar_url: None,
            gender: None,
        })
        .unwrap();
        assert!(!d.requires_auth());
        match d.payload_ref() {
            Payload::Structured { value, .. } => assert_eq!(value, &json!({"code": "wx-code", "nickName": "n"})),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn answer_submission_honors_encoding() {
        let answer = question::Answer {
            answer: "B",
            time_spent: Some(12),
        };
        for encoding in [PayloadEncoding::Query, PayloadEncoding::Json] {
            let d = question::submit_answer(9, &answer, encoding).unwrap();
            assert_eq!(d.url(), "/question/9/answer");
            match d.payload_ref() {
                Payload::Structured { value, encoding: e } => {
                    assert_eq!(*e, encoding);
                    assert_eq!(value, &json!({"answer": "B", "timeSpent": 12}));
                }
                other => panic!("unexpected payload: {other:?}"),
            }
        }
    }

    #[test]
    fn page_serializes_camel_case() {
        let d = community::my_posts(Page::default()).unwrap();
        match d.payload_ref() {
            Payload::Structured { value, .. } => assert_eq!(value, &json!({"pageNum": 1, "pageSize": 10})),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn path_parameters_are_interpolated() {
        assert_eq!(plan::today(4).url(), "/plan/4/today");
        assert_eq!(admin::delete_post(3).url(), "/admin/post/3");
        assert_eq!(admin::delete_post(3).method(), HttpMethod::Delete);
        assert_eq!(question::mark_mastered(5).url(), "/question/wrong/5/master");
    }
}
