use clap::{Parser, Subcommand};

/// collabd — project collaboration invites
#[derive(Parser)]
#[command(name = "collabd", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the invite API server
    Serve {
        /// Port to bind (defaults to COLLAB_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect or revoke pending invites
    Invite {
        #[command(subcommand)]
        command: InviteCommands,
    },
}

#[derive(Subcommand)]
pub enum InviteCommands {
    /// List pending invites for a project
    List {
        #[arg(long)]
        project_id: String,
    },
    /// Count pending invites for a project
    Count {
        #[arg(long)]
        project_id: String,
    },
    /// Revoke a pending invite
    Revoke {
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        invite_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_revoke() {
        let cli = Cli::try_parse_from([
            "collabd",
            "invite",
            "revoke",
            "--project-id",
            "p1",
            "--invite-id",
            "i1",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Invite {
                command: InviteCommands::Revoke { project_id, invite_id },
            }) => {
                assert_eq!(project_id, "p1");
                assert_eq!(invite_id, "i1");
            }
            _ => panic!("expected invite revoke"),
        }
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["collabd"]).unwrap();
        assert!(cli.command.is_none());
    }
}
