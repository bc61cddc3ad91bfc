use strum::EnumString;

#[derive(Default, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

// 環境変数 ENV の値から実行環境を判定する
// 不正な値や未設定の場合は Development として扱う
pub fn which() -> Environment {
    #[cfg(debug_assertions)]
    let default_env = "development";
    #[cfg(not(debug_assertions))]
    let default_env = "production";

    match std::env::var("ENV") {
        Err(_) => default_env.parse().unwrap_or_default(),
        Ok(v) => v.parse().unwrap_or_default(),
    }
}
