use rand::seq::SliceRandom;
use rand::Rng;

const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0",
];

const VIEWPORTS: [(u32, u32); 4] = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

/// Identity a tab presents to the registry site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timezone: String,
    pub locale: String,
}

impl FingerprintConfig {
    /// Pick a common desktop user agent and viewport at random.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();
        let user_agent = USER_AGENTS
            .choose(&mut rng)
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        let (width, height) = VIEWPORTS[rng.gen_range(0..VIEWPORTS.len())];

        Self {
            user_agent: user_agent.to_string(),
            viewport_width: width,
            viewport_height: height,
            timezone: "Asia/Shanghai".to_string(),
            locale: "zh-CN".to_string(),
        }
    }

    /// Fixed identity, used when the HTTP client and the browser must agree.
    pub fn fixed(user_agent: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            user_agent: user_agent.into(),
            viewport_width: width,
            viewport_height: height,
            timezone: "Asia/Shanghai".to_string(),
            locale: "zh-CN".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_randomized_fingerprint() {
        let config = FingerprintConfig::randomized();
        assert!(USER_AGENTS.contains(&config.user_agent.as_str()));
        assert!(VIEWPORTS.contains(&(config.viewport_width, config.viewport_height)));
        assert_eq!(config.timezone, "Asia/Shanghai");
        assert_eq!(config.locale, "zh-CN");
    }

    #[test]
    fn test_fingerprint_variation() {
        // Probabilistic, but 20 identical draws out of 3 agents is ~1e-9
        let configs: Vec<_> = (0..20).map(|_| FingerprintConfig::randomized()).collect();
        let first_ua = &configs[0].user_agent;
        assert!(
            !configs.iter().all(|c| &c.user_agent == first_ua),
            "Expected variation in user agents"
        );
    }

    #[test]
    fn test_fixed_fingerprint() {
        let config = FingerprintConfig::fixed("agent/1.0", 800, 600);
        assert_eq!(config.user_agent, "agent/1.0");
        assert_eq!((config.viewport_width, config.viewport_height), (800, 600));
    }
}
