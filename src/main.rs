#[macro_use]
mod log;
mod access;
mod bot;
mod commands;
mod config;
mod db;
mod notify;
mod reminder;
mod tickets;
#[cfg(test)]
mod tests;

trait ResultLog {
    type OkType;
    fn expect_log(self, msg: &str) -> Self::OkType;
}
impl<T, S: ToString> ResultLog for Result<T, S> {
    type OkType = T;
    fn expect_log(self, msg: &str) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                let e = e.to_string();
                if msg.is_empty() {
                    log_error!("{}", e);
                    panic!("{}", e)
                }
                log_error!("{}: {}", msg, e);
                panic!("{}: {}", msg, e)
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| "./config.json".to_string());
    let config = config::Config::load(&path).expect_log("Could not load the configuration file");
    crate::log::init(crate::log::parse_level(&config.log_level)).expect_log("Could not install the logger");
    log_info!("Configuration loaded from {}", config.filepath().to_string_lossy());
    let db = db::start_db(&config.database_url).await.expect_log("Could not open the database");
    let mut bot = bot::Bot::new(&config, db).await.expect_log("");
    bot.start().await.expect_log("Client won't start");
}
