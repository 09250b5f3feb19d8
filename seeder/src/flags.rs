use std::path::{Path, PathBuf};

xflags::xflags! {
    /// Bootstraps CMS content from a content directory.
    cmd seeder {
        /// The store to read and write. Defaults to `store` in `seeder.toml`,
        /// then `<dir>/store.json`.
        optional --store path: PathBuf
        /// Logs more; repeat for more still. `RUST_LOG` takes precedence.
        repeated -v, --verbose

        /// Builds the page tree from `<dir>/pages`.
        cmd content {
            required dir: PathBuf
            /// The username owning every created page.
            required --owner username: String
            /// Builds every page without writing anything.
            optional --dry-run
        }

        /// Imports `<dir>/image-library` and `<dir>/document-library`.
        cmd assets {
            required dir: PathBuf
            /// The username owning every imported asset.
            required --owner username: String
        }

        /// Creates or updates the records in `<dir>/models`.
        cmd models {
            required dir: PathBuf
        }

        /// Creates the users in `<dir>/users.yml`.
        cmd users {
            required dir: PathBuf
        }
    }
}

impl SeederCmd {
    /// The content directory the command operates on.
    pub fn dir(&self) -> &Path {
        match self {
            SeederCmd::Content(cmd) => &cmd.dir,
            SeederCmd::Assets(cmd) => &cmd.dir,
            SeederCmd::Models(cmd) => &cmd.dir,
            SeederCmd::Users(cmd) => &cmd.dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> xflags::Result<Seeder> {
        Seeder::from_vec(args.iter().map(Into::into).collect())
    }

    #[test]
    fn content_flags() {
        let flags = parse(&["-v", "-v", "content", "site", "--owner", "admin", "--dry-run"]).unwrap();
        assert_eq!(flags.verbose, 2);
        assert!(flags.store.is_none());
        match flags.subcommand {
            SeederCmd::Content(cmd) => {
                assert_eq!(cmd.dir, Path::new("site"));
                assert_eq!(cmd.owner, "admin");
                assert!(cmd.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn owner_is_required() {
        assert!(parse(&["assets", "site"]).is_err());
        assert!(parse(&["--store", "s.json", "models", "site"]).is_ok());
    }
}
