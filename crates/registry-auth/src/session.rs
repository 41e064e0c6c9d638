//! Login state machine.
//!
//! ```text
//! LoggedOut ──begin(cookie)──────────────────────────────► Authenticated
//!     │                                                       ▲
//!     └─begin(qrcode|phone)─► AwaitingChallenge{QrCode|Phone} ─┤
//!                                 │        ▲                  │
//!                          captcha│        │cleared           │
//!                                 ▼        │                  │
//!                          AwaitingChallenge{Captcha}         │
//!                                                             │
//! any timeout / rejected cookie ──────────────────────────► Failed
//! ```

use crate::cookies::{parse_cookie_string, serialize_cookies};
use crate::error::{AuthError, Result};
use crate::surface::LoginSurface;
use registry_core::{LoginConfig, LoginMode};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use zeroize::Zeroizing;

const QRCODE_SELECTOR: &str = ".qrcode-img";
const PHONE_TAB_SELECTOR: &str = ".phone-login-tab";
const PHONE_INPUT_SELECTOR: &str = ".phone-input";
const SEND_CODE_SELECTOR: &str = ".send-code-btn";
const CAPTCHA_SELECTOR: &str = ".captcha-container";
const LOGGED_IN_SELECTORS: [&str; 2] = [".user-info", ".user-avatar"];

/// Which human action the session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    /// QR code scan in the mobile app
    QrCode,
    /// SMS code entry
    Phone,
    /// Captcha solved in the browser
    Captcha,
}

/// Observable login state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// No login attempted yet
    LoggedOut,
    /// Waiting for a human to complete a challenge
    AwaitingChallenge(ChallengeKind),
    /// A credential string is available
    Authenticated,
    /// The last attempt failed; the reason is logged
    Failed,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => write!(f, "logged_out"),
            Self::AwaitingChallenge(ChallengeKind::QrCode) => write!(f, "awaiting_qrcode"),
            Self::AwaitingChallenge(ChallengeKind::Phone) => write!(f, "awaiting_phone"),
            Self::AwaitingChallenge(ChallengeKind::Captcha) => write!(f, "awaiting_captcha"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Secrets a login mode may need.
#[derive(Default)]
pub struct Credentials {
    /// Cookie string for cookie mode
    pub cookie: Option<Zeroizing<String>>,
    /// Phone number for phone mode
    pub phone: Option<String>,
}

impl Credentials {
    /// Take the credentials configured in `[login]`.
    pub fn from_config(config: &LoginConfig) -> Self {
        Self {
            cookie: config.cookie.clone().map(Zeroizing::new),
            phone: config.phone.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("phone", &self.phone)
            .finish()
    }
}

/// URLs and timing for a login run.
#[derive(Debug, Clone)]
pub struct LoginSettings {
    /// Challenge page
    pub login_url: String,
    /// Page probed to confirm the session
    pub home_url: String,
    /// Domain injected cookies are scoped to
    pub cookie_domain: String,
    /// Ceiling for the whole challenge
    pub timeout: Duration,
    /// Interval between probes
    pub poll_interval: Duration,
    /// Ceiling for a captcha to be cleared
    pub captcha_timeout: Duration,
}

impl LoginSettings {
    /// Derive URLs from the platform origin and timing from `[login]`.
    pub fn new(base_url: &str, config: &LoginConfig) -> Result<Self> {
        let base = url::Url::parse(base_url)
            .map_err(|e| AuthError::Login(format!("invalid base URL '{base_url}': {e}")))?;
        let host = base
            .host_str()
            .ok_or_else(|| AuthError::Login(format!("base URL '{base_url}' has no host")))?;
        let origin = base_url.trim_end_matches('/');

        Ok(Self {
            login_url: format!("{origin}/login"),
            home_url: format!("{origin}/"),
            cookie_domain: format!(".{host}"),
            timeout: Duration::from_secs(config.timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            captcha_timeout: Duration::from_secs(config.captcha_timeout_secs),
        })
    }
}

/// Drives a [`LoginSurface`] through a login and holds the resulting credential.
pub struct AuthSession<S> {
    surface: S,
    settings: LoginSettings,
    state: LoginState,
    credential: Option<Zeroizing<String>>,
}

impl<S: LoginSurface> AuthSession<S> {
    /// New logged-out session.
    pub fn new(surface: S, settings: LoginSettings) -> Self {
        Self {
            surface,
            settings,
            state: LoginState::LoggedOut,
            credential: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// Credential string from the last successful login.
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_ref().map(|c| c.as_str())
    }

    /// Surface the session drives.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Give the surface back, e.g. to close a browser tab.
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Log in with `mode` and return the serialized cookie credential.
    pub async fn begin(
        &mut self,
        mode: LoginMode,
        credentials: &Credentials,
    ) -> Result<Zeroizing<String>> {
        tracing::info!(%mode, "Starting login");
        let challenge = match mode {
            LoginMode::Cookie => self.login_with_cookie(credentials).await,
            LoginMode::Qrcode => self.login_with_qrcode().await,
            LoginMode::Phone => self.login_with_phone(credentials).await,
        };
        let outcome = match challenge {
            Ok(()) => self.capture_credential(credentials).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(credential) => {
                self.transition(LoginState::Authenticated);
                self.credential = Some(credential.clone());
                Ok(credential)
            }
            Err(e) => {
                tracing::error!(%mode, "Login failed: {}", e);
                self.transition(LoginState::Failed);
                self.credential = None;
                Err(e)
            }
        }
    }

    /// Re-probe the home page. Any failure counts as logged out.
    ///
    /// The platform redirects unauthenticated visitors to its login page, so
    /// landing anywhere else (or seeing a user widget) means the session holds.
    pub async fn check_login_state(&self) -> bool {
        if let Err(e) = self.surface.navigate(&self.settings.home_url).await {
            tracing::warn!("Login state probe could not load home page: {}", e);
            return false;
        }
        self.is_logged_in().await
    }

    async fn login_with_cookie(&mut self, credentials: &Credentials) -> Result<()> {
        let raw = credentials
            .cookie
            .as_ref()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCredential {
                mode: "cookie",
                field: "a cookie string",
            })?;

        let cookies = parse_cookie_string(raw, &self.settings.cookie_domain);
        if cookies.is_empty() {
            return Err(AuthError::InvalidSession(
                "cookie string has no name=value pairs".to_string(),
            ));
        }

        self.surface.navigate(&self.settings.home_url).await?;
        self.surface.set_cookies(&cookies).await?;
        tracing::debug!(count = cookies.len(), "Injected session cookies");

        if self.check_login_state().await {
            Ok(())
        } else {
            Err(AuthError::InvalidSession(
                "platform did not accept the supplied cookies".to_string(),
            ))
        }
    }

    async fn login_with_qrcode(&mut self) -> Result<()> {
        self.surface.navigate(&self.settings.login_url).await?;
        self.transition(LoginState::AwaitingChallenge(ChallengeKind::QrCode));

        if self.surface.has_element(QRCODE_SELECTOR).await? {
            tracing::info!("QR code displayed, scan it with the mobile app");
        } else {
            tracing::warn!("QR code element not found yet, still waiting for login");
        }

        self.poll_until_authenticated(ChallengeKind::QrCode).await
    }

    async fn login_with_phone(&mut self, credentials: &Credentials) -> Result<()> {
        let phone = credentials
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingCredential {
                mode: "phone",
                field: "a phone number",
            })?;

        self.surface.navigate(&self.settings.login_url).await?;
        self.surface.click(PHONE_TAB_SELECTOR).await?;
        self.surface.fill(PHONE_INPUT_SELECTOR, phone).await?;
        self.surface.click(SEND_CODE_SELECTOR).await?;
        self.transition(LoginState::AwaitingChallenge(ChallengeKind::Phone));
        tracing::info!("Verification code sent, enter it in the browser");

        self.poll_until_authenticated(ChallengeKind::Phone).await
    }

    /// Outer poll: authenticated, or captcha detour, or timeout.
    async fn poll_until_authenticated(&mut self, challenge: ChallengeKind) -> Result<()> {
        let deadline = Instant::now() + self.settings.timeout;

        loop {
            if self.surface.has_element(CAPTCHA_SELECTOR).await? {
                self.transition(LoginState::AwaitingChallenge(ChallengeKind::Captcha));
                tracing::warn!("Captcha detected, solve it in the browser");
                self.wait_for_captcha_clearance().await?;
                self.transition(LoginState::AwaitingChallenge(challenge));
            }

            if self.is_logged_in().await {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(AuthError::LoginTimeout(self.settings.timeout));
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn wait_for_captcha_clearance(&self) -> Result<()> {
        let deadline = Instant::now() + self.settings.captcha_timeout;
        loop {
            tokio::time::sleep(self.settings.poll_interval).await;
            if !self.surface.has_element(CAPTCHA_SELECTOR).await? {
                tracing::info!("Captcha cleared");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AuthError::Captcha(self.settings.captcha_timeout));
            }
        }
    }

    async fn is_logged_in(&self) -> bool {
        match self.surface.current_url().await {
            Ok(Some(url)) if !url.contains("login") && url.starts_with("http") => return true,
            Ok(_) => {}
            Err(e) => tracing::debug!("current_url probe failed: {}", e),
        }
        for selector in LOGGED_IN_SELECTORS {
            if matches!(self.surface.has_element(selector).await, Ok(true)) {
                return true;
            }
        }
        false
    }

    async fn capture_credential(&self, credentials: &Credentials) -> Result<Zeroizing<String>> {
        let cookies = self.surface.cookies().await?;
        if !cookies.is_empty() {
            return Ok(Zeroizing::new(serialize_cookies(&cookies)));
        }
        // Surfaces that do not expose cookies still carry the injected ones.
        let supplied = credentials
            .cookie
            .as_ref()
            .map(|c| serialize_cookies(&parse_cookie_string(c, &self.settings.cookie_domain)))
            .unwrap_or_default();
        Ok(Zeroizing::new(supplied))
    }

    fn transition(&mut self, next: LoginState) {
        if self.state != next {
            tracing::info!(from = %self.state, to = %next, "Login state changed");
            self.state = next;
        }
    }
}
