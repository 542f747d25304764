use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    cache::{CacheLookup, PageResult, QueryKey},
    listing::{ListingPhase, ListingState},
    workflow::Notice,
    ClientEvent, PostdeckClient,
};
use shared::domain::{OwnerId, Post, PostId, StatusFilter};
use tokio::sync::broadcast;

mod config;

#[derive(Parser, Debug)]
#[command(name = "postdeck", about = "Console client for the posts service")]
struct Cli {
    /// Override the configured API base URL.
    #[arg(long)]
    api_url: Option<String>,
    /// Override the configured owner identifier.
    #[arg(long)]
    owner: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse the public listing.
    Browse {
        #[arg(long, default_value = "")]
        search: String,
        /// any, published, or unpublished.
        #[arg(long, default_value = "any")]
        status: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List the posts owned by the configured identity.
    Mine,
    /// Create a post.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        publish: bool,
    },
    /// Update one of your posts; omitted fields keep their current value.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        publish: Option<bool>,
    },
    /// Delete one of your posts.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let mut settings = config::load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(owner) = cli.owner {
        settings.owner_id = owner;
    }
    if settings.owner_id.is_empty() {
        bail!("no owner id configured; set owner_id in postdeck.toml or pass --owner");
    }
    let base_url = config::normalize_base_url(&settings.api_base_url)?;

    let client = PostdeckClient::connect(base_url, OwnerId(settings.owner_id));

    match cli.command {
        Command::Browse {
            search,
            status,
            page,
        } => browse(client, search, parse_status(&status)?, page).await,
        Command::Mine => list_mine(client).await,
        Command::Create {
            title,
            content,
            publish,
        } => create(client, title, content, publish).await,
        Command::Update {
            id,
            title,
            content,
            publish,
        } => update(client, PostId(id), title, content, publish).await,
        Command::Delete { id } => delete(client, PostId(id)).await,
    }
}

fn parse_status(raw: &str) -> Result<StatusFilter> {
    if raw.eq_ignore_ascii_case("any") {
        Ok(StatusFilter::Any)
    } else if raw.eq_ignore_ascii_case("published") {
        Ok(StatusFilter::Published)
    } else if raw.eq_ignore_ascii_case("unpublished") {
        Ok(StatusFilter::Unpublished)
    } else {
        bail!("unknown status filter '{raw}' (expected any, published, or unpublished)")
    }
}

async fn browse(
    mut client: PostdeckClient,
    search: String,
    status: StatusFilter,
    page: u32,
) -> Result<()> {
    let mut events = client.subscribe_events();
    let mut listing = ListingState::new();

    client.browse().set_search_text(search).await;
    let lookup = client.browse().set_status_filter(status).await;
    listing.begin(lookup);
    let mut result = settle(&mut client, &mut listing, &mut events).await?;

    if page > 1 {
        let Some(lookup) = client.browse().set_page(page).await else {
            bail!(
                "page {page} is out of range (1..={})",
                client.browse().total_pages()
            );
        };
        listing.begin(lookup);
        result = settle(&mut client, &mut listing, &mut events).await?;
    }

    println!(
        "page {} of {}",
        client.browse().signature().page,
        result.total_pages
    );
    print_posts(&result.items);
    Ok(())
}

/// Pump events until the listing reaches a terminal phase for the signature
/// that is current at that moment.
async fn settle(
    client: &mut PostdeckClient,
    listing: &mut ListingState,
    events: &mut broadcast::Receiver<ClientEvent>,
) -> Result<PageResult> {
    loop {
        match listing.phase() {
            ListingPhase::Ready(result) => return Ok(result.clone()),
            ListingPhase::Failed(error) => bail!("listing failed: {error}"),
            ListingPhase::Loading => {}
        }
        let event = events.recv().await?;
        if let ClientEvent::PageReady { result } = &event {
            client.browse().note_page_result(result);
        }
        let current = QueryKey::Page(client.browse().signature().clone());
        listing.apply(&current, &event);
    }
}

async fn list_mine(client: PostdeckClient) -> Result<()> {
    let mut events = client.subscribe_events();
    let result = owner_listing(&client, &mut events).await?;
    print_posts(&result.items);
    Ok(())
}

async fn owner_listing(
    client: &PostdeckClient,
    events: &mut broadcast::Receiver<ClientEvent>,
) -> Result<PageResult> {
    match client.owner_listing().await {
        CacheLookup::Hit(result) => Ok(result),
        CacheLookup::Failed(error) => Err(anyhow!("listing failed: {error}")),
        CacheLookup::Loading => {
            let owner = client.owner().clone();
            loop {
                match events.recv().await? {
                    ClientEvent::PageReady { result } if result.key.is_owner(&owner) => {
                        return Ok(result);
                    }
                    ClientEvent::PageFailed { key, error } if key.is_owner(&owner) => {
                        bail!("listing failed: {error}");
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn create(
    mut client: PostdeckClient,
    title: String,
    content: String,
    publish: bool,
) -> Result<()> {
    let mut events = client.subscribe_events();
    client.workflow().open_create();
    client.workflow().set_title(title);
    client.workflow().set_content(content);
    client.workflow().set_publish(publish);
    client.workflow().submit().await;
    report(&mut events).await
}

async fn update(
    mut client: PostdeckClient,
    id: PostId,
    title: Option<String>,
    content: Option<String>,
    publish: Option<bool>,
) -> Result<()> {
    let mut events = client.subscribe_events();
    let listing = owner_listing(&client, &mut events).await?;
    let target = listing
        .items
        .iter()
        .find(|post| post.id == id)
        .cloned()
        .ok_or_else(|| anyhow!("post {id} is not in your listing"))?;

    client.workflow().open_edit(target);
    if let Some(title) = title {
        client.workflow().set_title(title);
    }
    if let Some(content) = content {
        client.workflow().set_content(content);
    }
    if let Some(publish) = publish {
        client.workflow().set_publish(publish);
    }
    client.workflow().submit().await;
    report(&mut events).await
}

async fn delete(mut client: PostdeckClient, id: PostId) -> Result<()> {
    let mut events = client.subscribe_events();
    client.workflow().open_delete(id);
    client.workflow().confirm_delete().await;
    report(&mut events).await
}

/// Print the outcome notice of a mutation; an error notice becomes a
/// non-zero exit.
async fn report(events: &mut broadcast::Receiver<ClientEvent>) -> Result<()> {
    loop {
        if let ClientEvent::Notice(notice) = events.recv().await? {
            return match notice {
                Notice::Success(message) => {
                    println!("{message}");
                    Ok(())
                }
                Notice::Error(message) => Err(anyhow!(message)),
            };
        }
    }
}

fn print_posts(posts: &[Post]) {
    if posts.is_empty() {
        println!("no posts");
        return;
    }
    for post in posts {
        let status = if post.published { "published" } else { "draft" };
        let author = post.author_name.as_deref().unwrap_or("unknown");
        println!("{} [{status}] {} (by {author})", post.id, post.title);
    }
}
