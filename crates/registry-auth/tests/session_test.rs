use async_trait::async_trait;
use registry_auth::{
    AuthError, AuthSession, Credentials, LoginSettings, LoginState, LoginSurface,
};
use registry_browser::{Result as BrowserResult, SessionCookie};
use registry_core::{LoginConfig, LoginMode};
use std::sync::Mutex;
use zeroize::Zeroizing;

const BASE: &str = "https://aiqicha.baidu.com";
const HOME: &str = "https://aiqicha.baidu.com/";

/// Scripted stand-in for a browser tab.
#[derive(Default)]
struct FakeSurface {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    url: String,
    authenticated: bool,
    /// Authenticate once `current_url` has been polled this many times
    login_after_polls: Option<u32>,
    polls: u32,
    /// Remaining captcha probes that report the captcha as present
    captcha_probes: u32,
    /// Cookie name the platform accepts as a session
    accepted_cookie: Option<String>,
    cookies: Vec<SessionCookie>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
}

impl FakeSurface {
    fn with(configure: impl FnOnce(&mut FakeState)) -> Self {
        let surface = Self::default();
        configure(&mut surface.state.lock().unwrap());
        surface
    }
}

#[async_trait]
impl LoginSurface for FakeSurface {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.url = if url == HOME && !state.authenticated {
            format!("{BASE}/login?redirect=home")
        } else {
            url.to_string()
        };
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.polls += 1;
        if let Some(after) = state.login_after_polls {
            if state.polls >= after {
                state.authenticated = true;
                state.url = HOME.to_string();
                state.cookies = vec![SessionCookie::new("BDUSS", "scanned")];
            }
        }
        Ok(Some(state.url.clone()))
    }

    async fn has_element(&self, selector: &str) -> BrowserResult<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(match selector {
            ".captcha-container" if state.captcha_probes > 0 => {
                state.captcha_probes -= 1;
                true
            }
            ".qrcode-img" => true,
            _ => false,
        })
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        self.state.lock().unwrap().clicks.push(selector.to_string());
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> BrowserResult<()> {
        self.state
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.cookies.extend_from_slice(cookies);
        if let Some(accepted) = &state.accepted_cookie {
            if cookies.iter().any(|c| &c.name == accepted) {
                state.authenticated = true;
            }
        }
        Ok(())
    }

    async fn cookies(&self) -> BrowserResult<Vec<SessionCookie>> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }
}

fn session(surface: FakeSurface) -> AuthSession<FakeSurface> {
    let settings = LoginSettings::new(BASE, &LoginConfig::default()).expect("settings");
    AuthSession::new(surface, settings)
}

fn cookie_credentials(raw: &str) -> Credentials {
    Credentials {
        cookie: Some(Zeroizing::new(raw.to_string())),
        phone: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_qrcode_login_succeeds_after_scan() {
    let mut session = session(FakeSurface::with(|s| s.login_after_polls = Some(3)));
    assert_eq!(session.state(), &LoginState::LoggedOut);

    let credential = session
        .begin(LoginMode::Qrcode, &Credentials::default())
        .await
        .expect("login");

    assert_eq!(credential.as_str(), "BDUSS=scanned");
    assert_eq!(session.state(), &LoginState::Authenticated);
    assert_eq!(session.credential(), Some("BDUSS=scanned"));
}

#[tokio::test(start_paused = true)]
async fn test_qrcode_login_times_out() {
    let mut session = session(FakeSurface::default());

    let started = tokio::time::Instant::now();
    let result = session.begin(LoginMode::Qrcode, &Credentials::default()).await;

    assert!(matches!(result, Err(AuthError::LoginTimeout(_))));
    assert_eq!(session.state(), &LoginState::Failed);
    assert!(session.credential().is_none());
    assert!(started.elapsed() >= std::time::Duration::from_secs(180));
}

#[tokio::test(start_paused = true)]
async fn test_captcha_suspends_then_resumes() {
    let mut session = session(FakeSurface::with(|s| {
        s.captcha_probes = 3;
        s.login_after_polls = Some(2);
    }));

    session
        .begin(LoginMode::Qrcode, &Credentials::default())
        .await
        .expect("login after captcha");
    assert_eq!(session.state(), &LoginState::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_unsolved_captcha_fails() {
    let mut session = session(FakeSurface::with(|s| s.captcha_probes = u32::MAX));

    let result = session.begin(LoginMode::Qrcode, &Credentials::default()).await;
    assert!(matches!(result, Err(AuthError::Captcha(_))));
    assert_eq!(session.state(), &LoginState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_phone_login_drives_form() {
    let mut session = session(FakeSurface::with(|s| s.login_after_polls = Some(2)));
    let credentials = Credentials {
        cookie: None,
        phone: Some("13800000000".to_string()),
    };

    session
        .begin(LoginMode::Phone, &credentials)
        .await
        .expect("phone login");

    let state = session.surface().state.lock().unwrap();
    assert_eq!(state.clicks, vec![".phone-login-tab", ".send-code-btn"]);
    assert_eq!(
        state.fills,
        vec![(".phone-input".to_string(), "13800000000".to_string())]
    );
}

#[tokio::test]
async fn test_phone_login_requires_number() {
    let mut session = session(FakeSurface::default());
    let result = session.begin(LoginMode::Phone, &Credentials::default()).await;
    assert!(matches!(
        result,
        Err(AuthError::MissingCredential { mode: "phone", .. })
    ));
    assert_eq!(session.state(), &LoginState::Failed);
}

#[tokio::test]
async fn test_cookie_login_accepted() {
    let mut session = session(FakeSurface::with(|s| {
        s.accepted_cookie = Some("BDUSS".to_string());
    }));

    let credential = session
        .begin(LoginMode::Cookie, &cookie_credentials("BDUSS=abc; STOKEN=def"))
        .await
        .expect("cookie login");

    assert_eq!(credential.as_str(), "BDUSS=abc; STOKEN=def");
    assert_eq!(session.state(), &LoginState::Authenticated);
    assert!(session.check_login_state().await);
}

#[tokio::test]
async fn test_cookie_login_rejected() {
    let mut session = session(FakeSurface::with(|s| {
        s.accepted_cookie = Some("BDUSS".to_string());
    }));

    let result = session
        .begin(LoginMode::Cookie, &cookie_credentials("OTHER=1"))
        .await;

    assert!(matches!(result, Err(AuthError::InvalidSession(_))));
    assert_eq!(session.state(), &LoginState::Failed);
    assert!(!session.check_login_state().await);
}

#[tokio::test]
async fn test_cookie_login_requires_cookie() {
    let mut session = session(FakeSurface::default());

    let result = session
        .begin(LoginMode::Cookie, &cookie_credentials("   "))
        .await;
    assert!(matches!(
        result,
        Err(AuthError::MissingCredential { mode: "cookie", .. })
    ));

    let result = session
        .begin(LoginMode::Cookie, &cookie_credentials("no-pairs-here"))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidSession(_))));
}
