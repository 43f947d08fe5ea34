//! Walks one campaign through every build stage against the live platform.
//!
//! Needs `ADS_ACCESS_TOKEN` and `ADS_ADVERTISER_ID`. Set `ADS_FLOW=smart` for
//! the smart flow and `RUST_LOG=debug` to see every request.

use campaign_builder_rs::dayparting::{DaypartGrid, encode};
use campaign_builder_rs::draft::IdentityType;
use campaign_builder_rs::media::{MediaResolver, MediaSelection};
use campaign_builder_rs::schedule::parse_local;
use campaign_builder_rs::{
    AdDraft, AdGroupDraft, AdsApi, AdsClient, BuildFlow, CampaignBuilder, CampaignDraft,
    CampaignError, FileMediaCache, MediaCache, MemoryMediaCache, Result, SessionStore,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_builder_rs=info".into()),
        )
        .init();

    let client = AdsClient::from_env()?;
    let cache: Arc<dyn MediaCache> = if client.config().cache.enable_media_cache {
        Arc::new(FileMediaCache::from_config(&client.config().cache))
    } else {
        Arc::new(MemoryMediaCache::new())
    };
    let flow = match std::env::var("ADS_FLOW").as_deref() {
        Ok("smart") => BuildFlow::Smart,
        _ => BuildFlow::Manual,
    };

    let builder = CampaignBuilder::with_client(client);
    let resolver = MediaResolver::new(builder.api(), cache);
    let store = SessionStore::new();
    let token = store.create(flow).await;
    let session = store.get(token).await?;
    let mut session = session.lock().await;

    println!("Session {token} ({flow} flow)");

    let identities = builder.api().list_identities().await?;
    let identity = identities
        .first()
        .ok_or_else(|| CampaignError::validation("identity", "no identity on this account"))?;
    println!("Publishing as {} ({})", identity.display_name, identity.identity_id);

    let library = resolver.list_available_media().await?;
    println!("Media library: {} item(s)", library.len());
    let picks = library
        .iter()
        .take(if flow == BuildFlow::Smart { 3 } else { 1 })
        .map(|media| MediaSelection::of_kind(media.media_id.clone(), media.kind))
        .collect::<Vec<_>>();
    if picks.is_empty() {
        return Err(CampaignError::validation("media", "the media library is empty"));
    }

    let campaign_id = builder
        .create_campaign(&mut session, CampaignDraft::new("Q1 Promo"))
        .await?;
    println!("Campaign {campaign_id} created");

    let mut grid = DaypartGrid::new();
    for day in 1..=5 {
        grid.select_day(day);
    }
    println!("Delivering {} hour(s) a week", grid.selected_count());
    let ad_group = AdGroupDraft::new(
        "Weekdays",
        builder.rules().min_budget(flow),
        1.5,
        parse_local("2024-01-02T00:00")?,
    )
    .with_timezone("America/New_York")
    .with_dayparting(encode(true, &grid));
    let ad_group_id = builder.create_ad_group(&mut session, ad_group).await?;
    println!("Ad group {ad_group_id} created");

    let mut ad = AdDraft::new("Launch")
        .with_text_variants(["Shop the sale", "New season, new deals"])
        .with_identity(identity.identity_id.clone(), IdentityType::CustomizedUser)
        .with_destination("https://shop.example.com/sale");
    for pick in &picks {
        builder.add_creative(&mut ad, resolver.resolve(pick).await?)?;
    }
    builder.add_ad(&mut session, ad)?;

    let summary = builder.review(&mut session)?;
    println!("\n{summary}");

    let report = builder.publish(&mut session).await?;
    println!("{report}");

    builder.restart(&mut session);
    drop(session);
    store.discard(token).await;
    Ok(())
}
