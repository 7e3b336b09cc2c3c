use rand::Rng;

/// Upstream proxy endpoint attached to a session identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

impl ProxyEndpoint {
    /// Parse a `protocol://host:port` proxy URL.
    pub fn parse(raw: &str) -> Option<Self> {
        let (protocol, rest) = raw.split_once("://")?;
        let (host, port) = rest.rsplit_once(':')?;
        let port = port.parse().ok()?;
        if host.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            port,
            protocol: protocol.to_string(),
        })
    }
}

/// Rotating browser identity used to reduce automated-traffic fingerprinting.
///
/// A profile is bound to one session pool slot, counts its uses, and is
/// retired after too many uses or after a detected block event.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timezone: String,
    pub locale: String,
    pub proxy: Option<ProxyEndpoint>,
    /// Attempts served by this identity so far.
    pub uses: u32,
}

impl SessionProfile {
    /// Generate a randomized identity profile.
    ///
    /// Proxies come from the `JOBPILOT_PROXY_URLS` environment variable
    /// (comma-separated `protocol://host:port` entries); without it the
    /// profile uses a direct connection.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        // Common desktop user agents
        let user_agents = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        ];

        // Common viewport sizes
        let viewports = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900), (1280, 720)];

        let timezones = [
            "America/New_York",
            "America/Los_Angeles",
            "America/Chicago",
            "Europe/London",
            "Europe/Berlin",
        ];

        let locales = ["en-US", "en-GB", "en-CA", "en-AU"];

        let ua_idx = rng.gen_range(0..user_agents.len());
        let vp_idx = rng.gen_range(0..viewports.len());
        let (width, height) = viewports[vp_idx];
        let tz_idx = rng.gen_range(0..timezones.len());
        let loc_idx = rng.gen_range(0..locales.len());

        Self {
            user_agent: user_agents[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
            timezone: timezones[tz_idx].to_string(),
            locale: locales[loc_idx].to_string(),
            proxy: Self::random_proxy(&mut rng),
            uses: 0,
        }
    }

    fn random_proxy(rng: &mut impl Rng) -> Option<ProxyEndpoint> {
        let raw = std::env::var("JOBPILOT_PROXY_URLS").ok()?;
        let proxies: Vec<ProxyEndpoint> = raw
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                let parsed = ProxyEndpoint::parse(entry);
                if parsed.is_none() {
                    tracing::warn!("failed to parse proxy URL: {entry}");
                }
                parsed
            })
            .collect();

        if proxies.is_empty() {
            None
        } else {
            let idx = rng.gen_range(0..proxies.len());
            Some(proxies[idx].clone())
        }
    }
}
