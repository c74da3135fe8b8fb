//! Embedded HTML views
//!
//! Both views are rendered once at startup for the configured locale. Tests
//! locate elements through `data-testid` attributes and the `Login` heading,
//! so those must stay stable.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use loginlab_common::{Locale, Messages};

/// Pre-rendered pages for one locale
#[derive(Debug, Clone)]
pub struct Views {
    login: String,
    dashboard: String,
}

impl Views {
    pub fn render(locale: Locale) -> Self {
        let messages = locale.messages();
        Self {
            login: render_login(locale, messages),
            dashboard: render_dashboard(locale, messages),
        }
    }

    pub fn login_html(&self) -> &str {
        &self.login
    }

    pub fn dashboard_html(&self) -> &str {
        &self.dashboard
    }

    pub fn login(&self) -> Response {
        serve_html(self.login.clone())
    }

    pub fn dashboard(&self) -> Response {
        serve_html(self.dashboard.clone())
    }
}

fn serve_html(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

fn render_login(locale: Locale, messages: &Messages) -> String {
    // JSON string literals are valid JavaScript literals.
    let fallback = serde_json::Value::from(messages.internal).to_string();

    LOGIN_HTML
        .replace("{{style}}", STYLE)
        .replace("{{lang}}", locale.as_str())
        .replace("{{username_label}}", &escape_html(messages.username_label))
        .replace("{{password_label}}", &escape_html(messages.password_label))
        .replace("{{submit}}", &escape_html(messages.submit))
        .replace("{{fallback_message}}", &fallback)
}

fn render_dashboard(locale: Locale, messages: &Messages) -> String {
    DASHBOARD_HTML
        .replace("{{style}}", STYLE)
        .replace("{{lang}}", locale.as_str())
        .replace("{{welcome}}", &escape_html(messages.welcome))
        .replace("{{welcome_detail}}", &escape_html(messages.welcome_detail))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; background: #f3f4f6; margin: 0; min-height: 100vh; }
    main { max-width: 28rem; margin: 4rem auto; background: #fff; padding: 2rem; border-radius: .5rem; box-shadow: 0 1px 3px rgba(0,0,0,.15); }
    h1 { font-size: 1.75rem; margin: 0 0 1.5rem; }
    label { display: block; margin-bottom: 1rem; font-weight: 600; }
    input { display: block; width: 100%; box-sizing: border-box; margin-top: .35rem; padding: .5rem; border: 1px solid #d1d5db; border-radius: .25rem; }
    button { width: 100%; padding: .6rem; background: #2563eb; color: #fff; border: 0; border-radius: .25rem; font-size: 1rem; cursor: pointer; }
"#;

const LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html lang="{{lang}}">
<head>
  <meta charset="utf-8">
  <title>Login</title>
  <style>{{style}}</style>
</head>
<body>
  <main>
    <h1>Login</h1>
    <form id="login-form">
      <label>{{username_label}}
        <input type="text" name="username" autocomplete="username" data-testid="username-input" required>
      </label>
      <label>{{password_label}}
        <input type="password" name="password" autocomplete="current-password" data-testid="password-input" required>
      </label>
      <button type="submit" data-testid="submit-button">{{submit}}</button>
    </form>
  </main>
  <script>
    (function () {
      const form = document.getElementById('login-form');
      const fallback = {{fallback_message}};
      form.addEventListener('submit', async function (event) {
        event.preventDefault();
        const body = JSON.stringify({
          username: form.elements.username.value,
          password: form.elements.password.value,
        });
        let message = fallback;
        try {
          const response = await fetch('/api/login', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: body,
          });
          const data = await response.json();
          if (response.ok && data.success) {
            window.location.href = '/dashboard';
            return;
          }
          message = data.message || fallback;
        } catch (err) {
          message = fallback;
        }
        alert(message);
      });
    })();
  </script>
</body>
</html>
"#;

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="{{lang}}">
<head>
  <meta charset="utf-8">
  <title>Dashboard</title>
  <style>{{style}}</style>
</head>
<body>
  <main>
    <h1 data-testid="dashboard-title">Dashboard</h1>
    <p data-testid="welcome-message">{{welcome}}</p>
    <p>{{welcome_detail}}</p>
  </main>
</body>
</html>
"#;
