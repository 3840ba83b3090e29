//! Groupwise CLI - Command-line interface for Groupwise
//!
//! Inspects and edits the group memberships of daemon identities stored in a
//! permissions snapshot

use clap::{Parser, Subcommand, ValueEnum};
use groupwise_core::{
    init_logging, log_operation_error, performance, ChangeView, ErrorContext, GroupwiseConfig,
    GroupwiseError, GroupwiseResult, LoggingConfig, PermissionsBackend,
};
use groupwise_reconcile::{
    apply_session, classify, decode_identity_name_from_url, encode_identity_name_for_url,
    fetch_snapshot, filter_groups, group_members, render_table, select_identities, GroupEditSession,
    SnapshotBackend,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "groupwise")]
#[command(about = "Reconcile permission-group memberships of daemon identities")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Permissions snapshot (overrides snapshot.path)
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which groups are assigned to all or some of the selected identities
    Classify {
        /// Identity names
        #[arg(long = "select", required = true, num_args = 1..)]
        selected: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List groups with their member counts
    Groups {
        /// Only groups whose name contains every query (case-insensitive)
        #[arg(short, long)]
        query: Vec<String>,
    },

    /// Edit the groups of the selected identities and review the changes
    Edit {
        /// Identity names
        #[arg(long = "select", required = true, num_args = 1..)]
        selected: Vec<String>,

        /// Replace the groups assigned to every selected identity
        #[arg(long, value_delimiter = ',', conflicts_with = "clear")]
        set: Option<Vec<String>>,

        /// Deselect every group
        #[arg(long)]
        clear: bool,

        /// Assign a group to every selected identity
        #[arg(long)]
        add: Vec<String>,

        /// Remove a group from every selected identity
        #[arg(long)]
        remove: Vec<String>,

        /// Undo the last N edits
        #[arg(long, default_value = "0")]
        undo: usize,

        /// Group the change table by user or by group
        #[arg(long, value_enum)]
        group_by: Option<GroupBy>,

        /// Write the changes to the snapshot
        #[arg(long)]
        apply: bool,
    },

    /// Encode or decode an identity name for use in a URL path
    Url {
        #[command(subcommand)]
        action: UrlAction,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Set a configuration value (key=value format)
        #[arg(long)]
        set: Option<String>,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
enum UrlAction {
    Encode { name: String },
    Decode { segment: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    User,
    Group,
}

impl From<GroupBy> for ChangeView {
    fn from(value: GroupBy) -> Self {
        match value {
            GroupBy::User => ChangeView::User,
            GroupBy::Group => ChangeView::Group,
        }
    }
}

#[tokio::main]
async fn main() -> GroupwiseResult<()> {
    let cli = Cli::parse();

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };

    init_logging(&logging_config).map_err(|e| GroupwiseError::Config {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e),
        context: ErrorContext::new("cli")
            .with_operation("init_logging")
            .with_suggestion("Check the RUST_LOG environment variable"),
    })?;

    info!("Starting Groupwise CLI v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_ref())?;
    let snapshot_path = cli
        .snapshot
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.snapshot.path));

    let result = match cli.command {
        Commands::Classify { selected, json } => {
            handle_classify(&snapshot_path, &selected, json).await
        }
        Commands::Groups { query } => handle_groups(&snapshot_path, &query).await,
        Commands::Edit {
            selected,
            set,
            clear,
            add,
            remove,
            undo,
            group_by,
            apply,
        } => {
            let edits = EditRequest {
                set,
                clear,
                add,
                remove,
                undo,
            };
            let view = group_by.map(ChangeView::from).unwrap_or(config.review.group_by);
            handle_edit(&snapshot_path, &selected, edits, view, apply, &config).await
        }
        Commands::Url { action } => handle_url(action),
        Commands::Config {
            show,
            init,
            set,
            validate,
        } => handle_config(cli.config.as_ref(), show, init, set, validate),
    };

    if let Err(e) = &result {
        e.log();
    }
    result
}

fn load_config(config_path: Option<&PathBuf>) -> GroupwiseResult<GroupwiseConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return GroupwiseConfig::from_file(path);
    }

    let default_paths = [
        dirs::config_dir().map(|d| d.join("groupwise").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".groupwise").join("config.toml")),
        Some(PathBuf::from("groupwise.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return GroupwiseConfig::from_file(path);
        }
    }

    debug!("No configuration file found, using defaults");
    Ok(GroupwiseConfig::default())
}

/// Default location for `config --init` and `config --set`
fn get_config_path() -> GroupwiseResult<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .map(|dir| dir.join("groupwise").join("config.toml"))
        .ok_or_else(|| {
            groupwise_core::config_error!("Could not determine a configuration directory", "cli")
        })
}

async fn handle_classify(
    snapshot_path: &Path,
    selected_names: &[String],
    json: bool,
) -> GroupwiseResult<()> {
    let backend = SnapshotBackend::new(snapshot_path);
    let snapshot = fetch_snapshot(&backend).await?;

    let selected = select_identities(snapshot.identities, selected_names)?;
    debug!(selected = selected.len(), "Classifying group allocation");

    let classification = performance::measure_sync("classify", || {
        classify(&snapshot.groups, &selected)
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        println!("Assigned to all:  {}", display_list(&classification.all));
        println!("Assigned to some: {}", display_list(&classification.some));
    }

    Ok(())
}

async fn handle_groups(snapshot_path: &Path, queries: &[String]) -> GroupwiseResult<()> {
    let backend = SnapshotBackend::new(snapshot_path);
    let groups = backend.fetch_groups().await?;
    for group in filter_groups(&groups, queries) {
        let members = group_members(group);
        let description = if group.description.is_empty() {
            "N/A"
        } else {
            group.description.as_str()
        };
        println!(
            "{}\t{}\toidc={} tls={} total={}",
            group.name,
            description,
            members.oidc.len(),
            members.tls.len(),
            members.total
        );
    }

    Ok(())
}

struct EditRequest {
    set: Option<Vec<String>>,
    clear: bool,
    add: Vec<String>,
    remove: Vec<String>,
    undo: usize,
}

/// Replay the requested edits on a session: set or clear, then additions, removals and undos
fn apply_edits(session: &mut GroupEditSession, edits: EditRequest) -> GroupwiseResult<()> {
    if let Some(groups) = edits.set {
        for name in &groups {
            if !session.groups().iter().any(|group| &group.name == name) {
                return Err(groupwise_core::not_found_error!(
                    format!("group {}", name),
                    "cli"
                ));
            }
        }
        session.modify_groups(groups);
    } else if edits.clear {
        session.modify_groups(Vec::new());
    }

    for name in &edits.add {
        if !session.desired_state().groups_for_all.contains(name) {
            session.toggle_group(name)?;
        }
    }

    for name in &edits.remove {
        session.deselect_group(name)?;
    }

    for _ in 0..edits.undo {
        if !session.undo() {
            break;
        }
    }

    Ok(())
}

async fn handle_edit(
    snapshot_path: &Path,
    selected_names: &[String],
    edits: EditRequest,
    view: ChangeView,
    apply: bool,
    config: &GroupwiseConfig,
) -> GroupwiseResult<()> {
    let backend = SnapshotBackend::new(snapshot_path);
    let snapshot = fetch_snapshot(&backend).await?;
    let mut session = GroupEditSession::new(snapshot.groups, snapshot.identities, selected_names)?;

    apply_edits(&mut session, edits)?;

    let auth_user_name = config.review.auth_user_name.as_deref();
    let review = session.review(auth_user_name);

    println!("{}", session.title());
    if session.modified_count() == 0 {
        println!("No group changes.");
        return Ok(());
    }
    println!("{}", session.modified_status());
    println!();
    print!("{}", render_table(&review, view, auth_user_name));

    if review.self_modification {
        println!();
        println!(
            "Caution: this modifies the permissions of the current logged-in user (YOU). \
             You might not be able to reverse this change once you've made it."
        );
    }

    if !apply {
        println!();
        println!("Run again with --apply to {}.", session.confirm_label().to_lowercase());
        return Ok(());
    }

    match apply_session(&backend, &session, config.apply.timeout_ms).await {
        Ok(outcome) => {
            println!();
            println!("{}", outcome.message);
            Ok(())
        }
        Err(e) => {
            log_operation_error!("edit", e, snapshot = %snapshot_path.display());
            eprintln!("Update groups failed: {}", e);
            Err(e)
        }
    }
}

fn handle_url(action: UrlAction) -> GroupwiseResult<()> {
    match action {
        UrlAction::Encode { name } => println!("{}", encode_identity_name_for_url(&name)),
        UrlAction::Decode { segment } => println!("{}", decode_identity_name_from_url(&segment)?),
    }
    Ok(())
}

fn handle_config(
    config_path: Option<&PathBuf>,
    show: bool,
    init: bool,
    set: Option<String>,
    validate: bool,
) -> GroupwiseResult<()> {
    if init {
        let path = match config_path {
            Some(path) => path.clone(),
            None => get_config_path()?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        GroupwiseConfig::default().save_to_file(&path)?;
        println!("Configuration initialized at: {:?}", path);
    }

    if let Some(key_value) = set {
        let path = match config_path {
            Some(path) => path.clone(),
            None => get_config_path()?,
        };
        let mut config = if path.exists() {
            GroupwiseConfig::from_file(&path)?
        } else {
            GroupwiseConfig::default()
        };

        let (key, value) = key_value.split_once('=').ok_or_else(|| GroupwiseError::Config {
            message: "Invalid format. Use key=value format".to_string(),
            source: None,
            context: ErrorContext::new("config_set")
                .with_suggestion("Example: --set review.group_by=group"),
        })?;
        set_config_value(&mut config, key, value)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.save_to_file(&path)?;
        println!("Set {} = {}", key, value);
    }

    if show || validate {
        let config = load_config(config_path)?;
        if show {
            let rendered = toml::to_string_pretty(&config).map_err(|e| GroupwiseError::Config {
                message: format!("Failed to render config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config_show"),
            })?;
            println!("{}", rendered);
        }
        if validate {
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}

fn set_config_value(config: &mut GroupwiseConfig, key: &str, value: &str) -> GroupwiseResult<()> {
    let invalid = |kind: &str| GroupwiseError::Config {
        message: format!("Invalid {} value: {}", kind, value),
        source: None,
        context: ErrorContext::new("config_set"),
    };

    match key.split('.').collect::<Vec<_>>().as_slice() {
        ["snapshot", "path"] => config.snapshot.path = value.to_string(),
        ["apply", "timeout_ms"] => {
            config.apply.timeout_ms = value.parse().map_err(|_| invalid("integer"))?;
        }
        ["review", "group_by"] => {
            config.review.group_by = value.parse().map_err(|_| invalid("view"))?;
        }
        ["review", "auth_user_name"] => {
            config.review.auth_user_name = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        _ => {
            return Err(GroupwiseError::Config {
                message: format!("Unknown configuration key: {}", key),
                source: None,
                context: ErrorContext::new("config_set")
                    .with_suggestion("Use --show to see available configuration keys"),
            });
        }
    }

    Ok(())
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupwise_core::{AuthMethod, Group, Identity};

    fn session() -> GroupEditSession {
        let groups = vec![
            Group::new("admins").with_members(AuthMethod::Oidc, ["u1"]),
            Group::new("ops"),
        ];
        let identities =
            vec![Identity::new("u1", "alice", AuthMethod::Oidc).with_groups(["admins"])];
        GroupEditSession::new(groups, identities, &["alice".to_string()]).unwrap()
    }

    fn request() -> EditRequest {
        EditRequest {
            set: None,
            clear: false,
            add: Vec::new(),
            remove: Vec::new(),
            undo: 0,
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut session = session();
        let edits = EditRequest {
            add: vec!["admins".to_string(), "ops".to_string()],
            ..request()
        };
        apply_edits(&mut session, edits).unwrap();

        assert_eq!(session.desired_state().groups_for_all, vec!["admins", "ops"]);
        assert_eq!(session.modified_count(), 1);
    }

    #[test]
    fn test_remove_takes_partial_group_from_holders() {
        let groups = vec![
            Group::new("admins").with_members(AuthMethod::Oidc, ["u1", "u2"]),
            Group::new("viewers").with_members(AuthMethod::Oidc, ["u1"]),
        ];
        let identities = vec![
            Identity::new("u1", "alice", AuthMethod::Oidc).with_groups(["admins", "viewers"]),
            Identity::new("u2", "bob", AuthMethod::Oidc).with_groups(["admins"]),
        ];
        let selected = vec!["alice".to_string(), "bob".to_string()];
        let mut session = GroupEditSession::new(groups, identities, &selected).unwrap();

        let edits = EditRequest {
            remove: vec!["viewers".to_string()],
            ..request()
        };
        apply_edits(&mut session, edits).unwrap();

        assert_eq!(session.modified_count(), 1);
        let plan = session.plan();
        assert_eq!(plan["u1"], vec!["admins"]);
        assert_eq!(plan["u2"], vec!["admins"]);
    }

    #[test]
    fn test_remove_rejects_unknown_group() {
        let mut session = session();
        let edits = EditRequest {
            remove: vec!["ghosts".to_string()],
            ..request()
        };
        assert!(matches!(
            apply_edits(&mut session, edits),
            Err(GroupwiseError::NotFound { .. })
        ));
    }

    #[test]
    fn test_set_drops_repeated_groups() {
        let mut session = session();
        let edits = EditRequest {
            set: Some(vec!["ops".to_string(), "ops".to_string()]),
            ..request()
        };
        apply_edits(&mut session, edits).unwrap();
        assert_eq!(session.plan()["u1"], vec!["ops"]);
    }

    #[test]
    fn test_set_rejects_unknown_group() {
        let mut session = session();
        let edits = EditRequest {
            set: Some(vec!["ghosts".to_string()]),
            ..request()
        };
        assert!(matches!(
            apply_edits(&mut session, edits),
            Err(GroupwiseError::NotFound { .. })
        ));
    }

    #[test]
    fn test_undo_after_edits() {
        let mut session = session();
        let edits = EditRequest {
            remove: vec!["admins".to_string()],
            undo: 5,
            ..request()
        };
        apply_edits(&mut session, edits).unwrap();
        assert_eq!(session.modified_count(), 0);
    }

    #[test]
    fn test_set_config_value() {
        let mut config = GroupwiseConfig::default();
        set_config_value(&mut config, "review.group_by", "group").unwrap();
        set_config_value(&mut config, "apply.timeout_ms", "500").unwrap();
        set_config_value(&mut config, "review.auth_user_name", "alice").unwrap();

        assert_eq!(config.review.group_by, ChangeView::Group);
        assert_eq!(config.apply.timeout_ms, 500);
        assert_eq!(config.review.auth_user_name.as_deref(), Some("alice"));

        assert!(set_config_value(&mut config, "apply.timeout_ms", "soon").is_err());
        assert!(set_config_value(&mut config, "llm.model", "x").is_err());
    }

    #[test]
    fn test_load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groupwise.toml");
        let mut config = GroupwiseConfig::default();
        config.snapshot.path = "/srv/permissions.json".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.snapshot.path, "/srv/permissions.json");
    }
}
