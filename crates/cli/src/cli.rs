use std::path::PathBuf;

use clap::Parser;

use chatyuk::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "chatyuk")]
#[command(about = "Chatyuk - XMPP group chat from the command line")]
#[command(version)]
pub struct Cli {
    /// Verbose logging (RUST_LOG still takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    /// Chat server domain users log in to
    #[arg(long, default_value = ServerConfig::DEFAULT_CHAT_SERVER)]
    pub server: String,

    /// Conference domain hosting the chat rooms
    #[arg(long, default_value = ServerConfig::DEFAULT_CONFERENCE_SERVER)]
    pub conference: String,

    /// Username to log in as (falls back to the saved session)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Room to join (falls back to the saved session)
    #[arg(short, long)]
    pub room: Option<String>,

    /// Password; leave empty for servers that allow open login
    #[arg(short, long, default_value = "")]
    pub password: String,

    /// Ignore any saved session and log in fresh
    #[arg(long)]
    pub fresh: bool,

    /// Cookie jar location (defaults to the user config dir)
    #[arg(long, value_name = "FILE")]
    pub cookie_file: Option<PathBuf>,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.server.clone(), self.conference.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_point_at_the_public_servers() {
        let cli = Cli::parse_from(["chatyuk"]);

        assert_eq!(cli.server, "chatyuk.com");
        assert_eq!(cli.conference, "conference.chatyuk.com");
        assert!(cli.username.is_none());
        assert!(!cli.fresh);
    }

    #[test]
    fn identity_flags_parse() {
        let cli = Cli::parse_from([
            "chatyuk", "-u", "fakeuser", "-r", "fakeroom", "-p", "fakepass", "--fresh",
        ]);

        assert_eq!(cli.username.as_deref(), Some("fakeuser"));
        assert_eq!(cli.room.as_deref(), Some("fakeroom"));
        assert_eq!(cli.password, "fakepass");
        assert!(cli.fresh);
    }
}
