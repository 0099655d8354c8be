// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/utils/user_agent.rs
// Version: 1.0.0
//
// Agent string sent to pools on login.

pub fn user_agent() -> String {
    format!("poolbridge/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_names_crate_and_version() {
        let agent = user_agent();
        assert!(agent.starts_with("poolbridge/"));
        assert!(agent.contains(env!("CARGO_PKG_VERSION")));
    }
}
