use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }

    pub fn per_hour(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60 * 60),
        }
    }

    pub fn per_day(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.window.as_secs() {
            60 => "minute".to_string(),
            3600 => "hour".to_string(),
            86400 => "day".to_string(),
            secs => format!("{} seconds", secs),
        };
        write!(f, "{} per {}", self.max_requests, unit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub limit: RateLimit,
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

struct Counters {
    // Keyed by (scope, client); the global scope is the empty string.
    windows: HashMap<(String, String), Vec<Window>>,
    last_sweep: Instant,
}

/// Fixed-window request counters keyed by client identity. Global limits
/// apply to every request and route limits only to their exact path. A
/// request is admitted only if every applicable limit still has room, and
/// only admitted requests are counted.
pub struct RateLimiter {
    global: Vec<RateLimit>,
    routes: Vec<(String, Vec<RateLimit>)>,
    sweep_every: Duration,
    counters: Mutex<Counters>,
}

const GLOBAL_SCOPE: &str = "";

impl RateLimiter {
    pub fn new(global: Vec<RateLimit>) -> Self {
        Self {
            global,
            routes: Vec::new(),
            sweep_every: Duration::from_secs(60),
            counters: Mutex::new(Counters {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Adds limits that only count requests to `path`.
    pub fn with_route(mut self, path: impl Into<String>, limits: Vec<RateLimit>) -> Self {
        self.routes.push((path.into(), limits));
        self
    }

    pub fn global_limits(&self) -> &[RateLimit] {
        &self.global
    }

    pub fn route_limits(&self) -> impl Iterator<Item = (&str, &[RateLimit])> {
        self.routes
            .iter()
            .map(|(path, limits)| (path.as_str(), limits.as_slice()))
    }

    fn scope_limits(&self, scope: &str) -> &[RateLimit] {
        if scope == GLOBAL_SCOPE {
            return &self.global;
        }
        self.routes
            .iter()
            .find(|(path, _)| path == scope)
            .map(|(_, limits)| limits.as_slice())
            .unwrap_or(&[])
    }

    pub fn check(&self, client: &str, path: &str) -> Result<(), Rejection> {
        self.check_at(client, path, Instant::now())
    }

    pub fn check_at(&self, client: &str, path: &str, now: Instant) -> Result<(), Rejection> {
        // Route limits first so the most specific ceiling is the one reported.
        let scopes: Vec<&str> = self
            .routes
            .iter()
            .filter(|(route, limits)| route == path && !limits.is_empty())
            .map(|(route, _)| route.as_str())
            .chain((!self.global.is_empty()).then_some(GLOBAL_SCOPE))
            .collect();
        if scopes.is_empty() {
            return Ok(());
        }

        // A poisoned lock only means another request panicked mid-update; the counters are still usable.
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        if now.saturating_duration_since(counters.last_sweep) >= self.sweep_every {
            self.sweep(&mut counters.windows, now);
            counters.last_sweep = now;
        }

        for &scope in &scopes {
            let limits = self.scope_limits(scope);
            let windows = counters
                .windows
                .entry((scope.to_string(), client.to_string()))
                .or_insert_with(|| {
                    vec![
                        Window {
                            started: now,
                            count: 0
                        };
                        limits.len()
                    ]
                });

            for (limit, window) in limits.iter().zip(windows.iter_mut()) {
                if now.saturating_duration_since(window.started) >= limit.window {
                    window.started = now;
                    window.count = 0;
                }
                if window.count >= limit.max_requests {
                    let elapsed = now.saturating_duration_since(window.started);
                    return Err(Rejection {
                        limit: *limit,
                        retry_after: limit.window.saturating_sub(elapsed),
                    });
                }
            }
        }

        for &scope in &scopes {
            let key = (scope.to_string(), client.to_string());
            if let Some(windows) = counters.windows.get_mut(&key) {
                for window in windows.iter_mut() {
                    window.count += 1;
                }
            }
        }
        Ok(())
    }

    /// Drops clients whose windows have all run out.
    fn sweep(&self, windows: &mut HashMap<(String, String), Vec<Window>>, now: Instant) {
        windows.retain(|(scope, _), client_windows| {
            self.scope_limits(scope)
                .iter()
                .zip(client_windows.iter())
                .any(|(limit, window)| now.saturating_duration_since(window.started) < limit.window)
        });
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .windows
            .len()
    }
}
