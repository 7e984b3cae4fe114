use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use frame_core::metadata::DEFAULT_TOKEN_ID;
use frame_core::models::TokenData;
use serde::Deserialize;
use serde_json::json;

use crate::state::SharedState;

const PAGE_TITLE: &str = "INEVITABLE: Distributed Cognition & Network Superintelligence";

/// The small fixed set of views the frame can show. Redirect states answer
/// with a 302 instead of a frame document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Initial,
    BookDetails,
    TokenPrice,
    AlexandriaRedirect,
    PersonalSiteRedirect,
    NounspaceRedirect,
    LaunchApp,
}

impl FrameState {
    /// Unknown names fall back to the initial frame.
    pub fn from_name(name: &str) -> Self {
        match name {
            "book-details" => FrameState::BookDetails,
            "token-price" => FrameState::TokenPrice,
            "alexandria-redirect" => FrameState::AlexandriaRedirect,
            "personal-site-redirect" => FrameState::PersonalSiteRedirect,
            "nounspace-redirect" => FrameState::NounspaceRedirect,
            "launch_app" => FrameState::LaunchApp,
            _ => FrameState::Initial,
        }
    }
}

/// Button order on the initial frame; a POSTed 1-based buttonIndex maps here.
const BUTTON_STATES: [FrameState; 4] = [
    FrameState::BookDetails,
    FrameState::TokenPrice,
    FrameState::LaunchApp,
    FrameState::NounspaceRedirect,
];

pub fn state_for_button(button_index: i64) -> FrameState {
    if button_index >= 1 && (button_index as usize) <= BUTTON_STATES.len() {
        BUTTON_STATES[button_index as usize - 1]
    } else {
        FrameState::Initial
    }
}

#[derive(Debug, Clone)]
pub enum ButtonAction {
    Post,
    PostRedirect(String),
}

#[derive(Debug, Clone)]
pub struct FrameButton {
    pub title: String,
    pub action: ButtonAction,
}

impl FrameButton {
    fn post(title: &str) -> Self {
        Self {
            title: title.to_string(),
            action: ButtonAction::Post,
        }
    }

    fn post_redirect(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            action: ButtonAction::PostRedirect(url.to_string()),
        }
    }
}

fn button_json(button: &FrameButton) -> serde_json::Value {
    match &button.action {
        ButtonAction::Post => json!({
            "title": button.title,
            "action": { "type": "post" },
        }),
        ButtonAction::PostRedirect(url) => json!({
            "title": button.title,
            "action": { "type": "post_redirect", "url": url },
        }),
    }
}

/// Renders the frame HTML document: the `fc:frame` meta JSON blob plus
/// individual image/button/input tags. The tag scheme supports at most 4
/// buttons; extras are dropped.
pub fn frame_html(
    image_url: &str,
    buttons: &[FrameButton],
    text_input: Option<&str>,
    default_link: &str,
) -> String {
    let rendered: Vec<&FrameButton> = buttons.iter().take(4).collect();

    let mut metadata = if rendered.len() > 1 {
        json!({
            "version": "vNext",
            "imageUrl": image_url,
            "buttons": rendered.iter().map(|b| button_json(b)).collect::<Vec<_>>(),
        })
    } else {
        json!({
            "version": "vNext",
            "imageUrl": image_url,
            "button": {
                "title": rendered.first().map(|b| b.title.as_str()).unwrap_or("View"),
                "action": { "type": "post_redirect", "url": default_link },
            },
        })
    };

    if let Some(placeholder) = text_input {
        metadata["textInput"] = json!({ "placeholder": placeholder });
    }

    let mut button_tags = String::new();
    for (i, button) in rendered.iter().enumerate() {
        button_tags.push_str(&format!(
            "  <meta property=\"fc:frame:button:{}\" content=\"{}\">\n",
            i + 1,
            button.title
        ));
    }
    if let Some(placeholder) = text_input {
        button_tags.push_str(&format!(
            "  <meta property=\"fc:frame:input:text\" content=\"{placeholder}\">\n"
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{PAGE_TITLE}</title>
  <meta property="og:title" content="{PAGE_TITLE}">
  <meta property="og:image" content="{image_url}">
  <meta property="fc:frame" content="{metadata}">
  <meta property="fc:frame:image" content="{image_url}">
{button_tags}</head>
<body>
  <h1>{PAGE_TITLE}</h1>
  <p>A Farcaster Frame for the NFT Book</p>
</body>
</html>
"#
    )
}

fn redirect(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

fn frame_response(html: String) -> Response {
    Html(html).into_response()
}

fn price_button_title(token: &TokenData) -> String {
    let price = token.price.parse::<f64>().unwrap_or(0.0);
    let change = token.price_change24h.parse::<f64>().unwrap_or(0.0);
    let direction = if change >= 0.0 { "▲" } else { "▼" };
    format!("${price:.8} {direction} {:.2}%", change.abs())
}

async fn render_state(state: &SharedState, frame_state: FrameState) -> Response {
    let links = &state.config.links;

    match frame_state {
        FrameState::AlexandriaRedirect => redirect(&links.alexandria),
        FrameState::PersonalSiteRedirect => redirect(&links.personal_site),
        FrameState::NounspaceRedirect => redirect(&links.nounspace),
        FrameState::LaunchApp => redirect(&links.app),
        FrameState::Initial => {
            let collection = state.book.fetch_collection_info().await;
            let image_url = if collection.image.is_empty() {
                state.config.book.cover_image.clone()
            } else {
                collection.image
            };

            let buttons = [
                FrameButton::post("📚 Book Details"),
                FrameButton::post("💰 $NSI Price"),
                FrameButton::post("🌟 Open Mini-App"),
                FrameButton::post("🗣️ Community"),
            ];
            frame_response(frame_html(&image_url, &buttons, None, &links.personal_site))
        }
        FrameState::BookDetails => {
            let metadata = state.book.fetch_book_metadata(DEFAULT_TOKEN_ID).await;
            let image_url = if metadata.image_uri.is_empty() {
                state.config.book.cover_image.clone()
            } else {
                metadata.image_uri
            };

            let buttons = [
                FrameButton::post("← Back"),
                FrameButton::post_redirect("📖 Read Now", &links.alexandria),
                FrameButton::post_redirect("🌐 Website", &links.personal_site),
                FrameButton::post_redirect("💬 Community", &links.nounspace),
            ];
            frame_response(frame_html(&image_url, &buttons, None, &links.personal_site))
        }
        FrameState::TokenPrice => {
            let token = state.price.fetch_token_data().await;

            let buttons = [
                FrameButton::post("← Back"),
                FrameButton::post(&price_button_title(&token)),
                FrameButton::post_redirect("💸 Buy $NSI", &links.buy),
                FrameButton::post_redirect("💬 Community", &links.nounspace),
            ];
            frame_response(frame_html(
                &state.config.book.cover_image,
                &buttons,
                None,
                &links.personal_site,
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FrameQuery {
    state: Option<String>,
    action: Option<String>,
}

pub async fn frame_get(
    State(state): State<SharedState>,
    Query(query): Query<FrameQuery>,
) -> Response {
    if query.action.as_deref() == Some("launch_app") {
        return redirect(&state.config.links.app);
    }

    let frame_state = FrameState::from_name(query.state.as_deref().unwrap_or("initial"));
    render_state(&state, frame_state).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FramePayload {
    untrusted_data: Option<UntrustedData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UntrustedData {
    button_index: Option<i64>,
}

pub async fn frame_post(State(state): State<SharedState>, body: String) -> Response {
    // A malformed body renders the initial frame rather than failing.
    let payload: FramePayload = serde_json::from_str(&body).unwrap_or_default();
    let button_index = payload
        .untrusted_data
        .and_then(|data| data.button_index)
        .unwrap_or(0);

    render_state(&state, state_for_button(button_index)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_index_maps_to_states() {
        assert_eq!(state_for_button(1), FrameState::BookDetails);
        assert_eq!(state_for_button(2), FrameState::TokenPrice);
        assert_eq!(state_for_button(3), FrameState::LaunchApp);
        assert_eq!(state_for_button(4), FrameState::NounspaceRedirect);
        assert_eq!(state_for_button(0), FrameState::Initial);
        assert_eq!(state_for_button(5), FrameState::Initial);
        assert_eq!(state_for_button(-1), FrameState::Initial);
    }

    #[test]
    fn test_unknown_state_name_is_initial() {
        assert_eq!(FrameState::from_name("bogus"), FrameState::Initial);
        assert_eq!(FrameState::from_name("token-price"), FrameState::TokenPrice);
        assert_eq!(FrameState::from_name("launch_app"), FrameState::LaunchApp);
    }

    #[test]
    fn test_frame_html_embeds_metadata_and_buttons() {
        let buttons = [
            FrameButton::post("One"),
            FrameButton::post_redirect("Two", "https://example.com"),
        ];
        let html = frame_html("https://img.example/cover.png", &buttons, None, "https://fallback");

        assert!(html.contains(r#"<meta property="fc:frame" content="#));
        assert!(html.contains(r#""version":"vNext""#));
        assert!(html.contains(r#"<meta property="fc:frame:image" content="https://img.example/cover.png">"#));
        assert!(html.contains(r#"<meta property="fc:frame:button:1" content="One">"#));
        assert!(html.contains(r#"<meta property="fc:frame:button:2" content="Two">"#));
        assert!(html.contains(r#""type":"post_redirect""#));
    }

    #[test]
    fn test_frame_html_caps_buttons_at_four() {
        let buttons = [
            FrameButton::post("1"),
            FrameButton::post("2"),
            FrameButton::post("3"),
            FrameButton::post("4"),
            FrameButton::post("5"),
        ];
        let html = frame_html("https://img", &buttons, None, "https://fallback");

        assert!(html.contains(r#"fc:frame:button:4"#));
        assert!(!html.contains(r#"fc:frame:button:5"#));
    }

    #[test]
    fn test_single_button_uses_default_link() {
        let buttons = [FrameButton::post("Read INEVITABLE")];
        let html = frame_html("https://img", &buttons, None, "https://epicdylan.com/getinevitable");

        assert!(html.contains(r#""button":"#));
        assert!(!html.contains(r#""buttons":"#));
        assert!(html.contains("https://epicdylan.com/getinevitable"));
    }

    #[test]
    fn test_text_input_tag_rendered_when_requested() {
        let buttons = [FrameButton::post("A"), FrameButton::post("B")];
        let html = frame_html("https://img", &buttons, Some("Say something"), "https://fallback");

        assert!(html.contains(r#"<meta property="fc:frame:input:text" content="Say something">"#));
        assert!(html.contains(r#""textInput""#));
    }

    #[tokio::test]
    async fn test_redirect_states_return_302_with_location() {
        let state = crate::state::test_support::test_state();

        let response = render_state(&state, FrameState::NounspaceRedirect).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://nounspace.example"
        );

        let response = render_state(&state, FrameState::AlexandriaRedirect).await;
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://alexandria.example"
        );
    }

    #[tokio::test]
    async fn test_launch_app_action_redirects_to_app() {
        let state = crate::state::test_support::test_state();
        let query = FrameQuery {
            state: None,
            action: Some("launch_app".to_string()),
        };

        let response = frame_get(State(state.clone()), Query(query)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/app?from=mini-app"
        );
    }

    #[test]
    fn test_price_button_title_formatting() {
        let mut token = frame_core::price::fallback_token_data("0xdead");
        token.price = "0.00000123".to_string();
        token.price_change24h = "5.2".to_string();
        assert_eq!(price_button_title(&token), "$0.00000123 ▲ 5.20%");

        token.price_change24h = "-11.5".to_string();
        assert_eq!(price_button_title(&token), "$0.00000123 ▼ 11.50%");
    }
}
