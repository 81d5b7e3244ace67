//! ynet - command line client for the y-net photo network
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use ynet::api::{CommentGateway, PostGateway, UserGateway};
use ynet::auth::EncryptedFileStore;
use ynet::models::NewComment;
use ynet::{
    ApiClient, Config, Credentials, FeedReconciler, LoadOutcome, Post, Profile, SessionManager,
};

type Session = SessionManager<ApiClient, EncryptedFileStore>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = parse_args()?;
    match command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            print_version();
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load()?;
    let client = ApiClient::from_config(&config)?;
    let session = SessionManager::new(client.clone(), EncryptedFileStore::open()?);
    session.initialize().await;

    let result = match command {
        Command::Login { username } => login(&session, &username).await,
        Command::Register { username, email } => register(&session, &username, email).await,
        Command::Logout => {
            session.logout().await;
            println!("✓ Logged out");
            Ok(())
        }
        Command::Whoami => whoami(&session),
        Command::Feed { limit, pages } => {
            let limit = limit.unwrap_or(config.feed_page_size);
            feed(&session, &client, limit, pages).await
        }
        Command::Like { post_id } => like(&session, &client, post_id).await,
        Command::Delete { post_id } => delete(&session, &client, post_id).await,
        Command::Comments { post_id } => comments(&session, &client, post_id).await,
        Command::Comment { post_id, message } => {
            comment(&session, &client, post_id, &message).await
        }
        Command::Search { term } => search(&session, &client, &term).await,
        Command::Help | Command::Version => Ok(()),
    };

    result.map_err(|e| match e.downcast_ref::<ynet::Error>() {
        Some(err) if err.is_auth_failure() => {
            anyhow::anyhow!("{}\nRun 'ynet login <username>' first", err.user_message())
        }
        Some(err) => anyhow::anyhow!(err.user_message()),
        None => e,
    })
}

/// CLI commands
enum Command {
    Login {
        username: String,
    },
    Register {
        username: String,
        email: Option<String>,
    },
    Logout,
    Whoami,
    Feed {
        limit: Option<usize>,
        pages: usize,
    },
    Like {
        post_id: Uuid,
    },
    Delete {
        post_id: Uuid,
    },
    Comments {
        post_id: Uuid,
    },
    Comment {
        post_id: Uuid,
        message: String,
    },
    Search {
        term: String,
    },
    Help,
    Version,
}

fn flag_value<'a>(args: &'a [String], long: &str, short: &str) -> Option<&'a String> {
    args.iter()
        .position(|a| a == long || a == short)
        .and_then(|i| args.get(i + 1))
}

fn post_id_arg(args: &[String]) -> Result<Uuid> {
    let raw = args.get(2).ok_or_else(|| anyhow::anyhow!("Missing post id"))?;
    Uuid::parse_str(raw).with_context(|| format!("Invalid post id: {raw}"))
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "login" => {
            let username = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing username"))?
                .clone();
            Ok(Command::Login { username })
        }

        "register" => {
            let username = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing username"))?
                .clone();
            let email = flag_value(&args, "--email", "-e").cloned();
            Ok(Command::Register { username, email })
        }

        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::Whoami),

        "feed" => {
            let limit = flag_value(&args, "--limit", "-l").and_then(|s| s.parse().ok());
            let pages = flag_value(&args, "--pages", "-p")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            Ok(Command::Feed { limit, pages })
        }

        "like" => Ok(Command::Like {
            post_id: post_id_arg(&args)?,
        }),
        "delete" => Ok(Command::Delete {
            post_id: post_id_arg(&args)?,
        }),
        "comments" => Ok(Command::Comments {
            post_id: post_id_arg(&args)?,
        }),

        "comment" => {
            let post_id = post_id_arg(&args)?;
            let message = args
                .get(3)
                .ok_or_else(|| anyhow::anyhow!("Missing comment text"))?
                .clone();
            Ok(Command::Comment { post_id, message })
        }

        "search" => {
            let term = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing search term"))?
                .clone();
            Ok(Command::Search { term })
        }

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'ynet --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"ynet - y-net from the terminal

USAGE:
    ynet [COMMAND]

COMMANDS:
    login <username>                   Log in (password read from stdin)
    register <username> [OPTIONS]      Create an account and log in
      Options:
        -e, --email <email>            Email address
    logout                             Forget the stored session
    whoami                             Show the logged-in user

    feed [OPTIONS]                     Show the global feed
      Options:
        -l, --limit <n>                Posts per page (default: from config)
        -p, --pages <n>                Pages to load (default: 1)

    like <post-id>                     Like or unlike a post
    delete <post-id>                   Delete one of your posts
    comments <post-id>                 Show comments on a post
    comment <post-id> <text>           Comment on a post
    search <term>                      Search users

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

ENVIRONMENT:
    YNET_API_HOST, YNET_API_PORT       Override the configured API server
    RUST_LOG                           Log filter (e.g. ynet=debug)

CONFIG:
    {}
"#,
        config_path
    );
}

fn print_version() {
    println!("ynet {}", ynet::VERSION);
}

fn read_password() -> Result<String> {
    println!("Password:");
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

async fn login(session: &Session, username: &str) -> Result<()> {
    let password = read_password()?;
    let user = session.login(&Credentials::new(username, password)).await?;
    println!("✓ Logged in as {}", user.handle());
    Ok(())
}

async fn register(session: &Session, username: &str, email: Option<String>) -> Result<()> {
    let password = read_password()?;
    let mut profile = Profile::new(username, password);
    profile.email = email;
    let user = session.register(&profile).await?;
    println!("✓ Account created, logged in as {}", user.handle());
    Ok(())
}

fn whoami(session: &Session) -> Result<()> {
    let current = session.current();
    let user = current.identity().ok_or(ynet::Error::Unauthenticated)?;
    println!("{} ({})", user.display_name(), user.handle());
    if let Some(email) = &user.email {
        println!("  {email}");
    }
    println!("  {} followers", user.follower_count);
    Ok(())
}

/// Bearer token and user id of the logged-in user
async fn viewer(session: &Session) -> Result<(Uuid, String)> {
    session.refresh_session_if_needed().await?;
    let current = session.current();
    let (id, token) = current.viewer().ok_or(ynet::Error::Unauthenticated)?;
    Ok((id, token.to_string()))
}

fn print_post(post: &Post, liked: bool) {
    println!("\n{} · {} · {}", post.author_name(), post.relative_time(), post.id);
    if post.description.is_some() {
        println!("{}", post.preview(280));
    }
    let heart = if liked { "♥" } else { "♡" };
    println!("{} {}  💬 {}", heart, post.like_count, post.comment_count);
}

async fn feed(session: &Session, client: &ApiClient, limit: usize, pages: usize) -> Result<()> {
    viewer(session).await?;
    let feed = FeedReconciler::new(client.clone(), session.subscribe());

    feed.initial_load(limit).await?;
    for _ in 1..pages {
        if feed.load_more(limit).await? != LoadOutcome::Loaded(limit) {
            break;
        }
    }

    let state = feed.state();
    if state.items.is_empty() {
        println!("No posts yet.");
        return Ok(());
    }
    for post in &state.items {
        print_post(post, state.is_liked(post.id));
    }
    if state.no_more_posts {
        println!("\n(end of feed)");
    }
    Ok(())
}

async fn like(session: &Session, client: &ApiClient, post_id: Uuid) -> Result<()> {
    let (_, token) = viewer(session).await?;
    let feed = FeedReconciler::new(client.clone(), session.subscribe());

    // Seed the like state so the toggle goes the right way
    let post = PostGateway::get(client, &token, post_id).await?;
    feed.track(post.clone());
    feed.reconcile_likes(std::slice::from_ref(&post)).await;
    let liked = feed.toggle_like(post_id).await?;
    println!("{}", if liked { "♥ Liked" } else { "♡ Unliked" });
    Ok(())
}

async fn delete(session: &Session, client: &ApiClient, post_id: Uuid) -> Result<()> {
    viewer(session).await?;
    let feed = FeedReconciler::new(client.clone(), session.subscribe());
    feed.delete_post(post_id).await?;
    println!("✓ Post deleted");
    Ok(())
}

async fn comments(session: &Session, client: &ApiClient, post_id: Uuid) -> Result<()> {
    let (_, token) = viewer(session).await?;
    let comments = client.list_for_post(&token, post_id).await?;
    if comments.is_empty() {
        println!("No comments.");
    }
    for comment in comments {
        let author = comment.user.as_ref().map_or("someone", |u| u.username.as_str());
        println!("@{}: {}", author, comment.message);
    }
    Ok(())
}

async fn comment(
    session: &Session,
    client: &ApiClient,
    post_id: Uuid,
    message: &str,
) -> Result<()> {
    let (me, token) = viewer(session).await?;
    let id = CommentGateway::create(client, &token, &NewComment::new(post_id, me, message)).await?;
    println!("✓ Comment {} added", id);
    Ok(())
}

async fn search(session: &Session, client: &ApiClient, term: &str) -> Result<()> {
    let (_, token) = viewer(session).await?;
    let users = client.search(&token, term).await?;
    if users.is_empty() {
        println!("No users match '{}'.", term);
    }
    for user in users {
        println!("{} ({})", user.handle(), user.display_name());
    }
    Ok(())
}
