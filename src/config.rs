use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

/// Base URLs and keys for the upstream content providers. The URLs are
/// overridable so tests can point a provider at a local mock server.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub meal_base_url: String,
    pub book_base_url: String,
    pub art_base_url: String,
    pub drink_base_url: String,
    pub weather_base_url: String,
    pub nasa_base_url: String,
    pub hobby_base_url: String,
    pub nasa_api_key: Option<String>,
    pub weather_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub providers: ProviderConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "curio"),
            audience: env_or("JWT_AUDIENCE", "curio-users"),
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let providers = ProviderConfig {
            meal_base_url: env_or("MEAL_API_BASE_URL", "https://www.themealdb.com/api/json/v1/1"),
            book_base_url: env_or("BOOK_API_BASE_URL", "https://openlibrary.org"),
            art_base_url: env_or("ART_API_BASE_URL", "https://api.artic.edu/api/v1"),
            drink_base_url: env_or(
                "DRINK_API_BASE_URL",
                "https://www.thecocktaildb.com/api/json/v1/1",
            ),
            weather_base_url: env_or("WEATHER_API_BASE_URL", "http://api.weatherstack.com"),
            nasa_base_url: env_or("NASA_API_BASE_URL", "https://api.nasa.gov"),
            hobby_base_url: env_or("HOBBY_API_BASE_URL", "https://bored-api.appbrewery.com"),
            nasa_api_key: std::env::var("NASA_API_KEY").ok(),
            weather_api_key: std::env::var("WEATHERSTACK_API_KEY").ok(),
        };
        Ok(Self {
            database_url,
            jwt,
            providers,
        })
    }
}
