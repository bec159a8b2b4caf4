use std::{sync::mpsc, time::Duration};

use retail_ads::{AdType, AdsQuery, Channel, ClientConfig, DebugCategory, PlacementRequest};

pub fn main() -> retail_ads::Result<()> {
    env_logger::init();

    let publisher_id = std::env::var("RETAIL_ADS_PUBLISHER_ID").unwrap();
    let client = ClientConfig::new(publisher_id, Channel::Site, || "demo-session".to_owned())
        .debug([DebugCategory::AdsLoad, DebugCategory::EventsAll])
        .debug_sink(|label: &str, message: &str| println!("[{label}] {message}"))
        .to_client()?;

    let query = AdsQuery::new()
        .placement(
            "search_top_product",
            PlacementRequest::new(3, [AdType::Product])?,
        )
        .placement(
            "search_banner",
            PlacementRequest::new(1, [AdType::Banner])?.with_size("desktop"),
        );
    let ads = client.ads().get_search_ads("smartphone", &query)?;

    // Report an impression for every ad and wait for the outcomes before exiting.
    let (tx, rx) = mpsc::channel();
    for (placement, placement_ads) in ads.placements() {
        for ad in placement_ads {
            let tx = tx.clone();
            let ad_id = ad.ad_id().to_owned();
            client
                .events()
                .deliver_beacon(ad.impression_url(), Some(placement), move |success| {
                    let _ = tx.send((ad_id, success));
                });
        }
    }
    drop(tx);

    while let Ok((ad_id, success)) = rx.recv_timeout(Duration::from_secs(2)) {
        println!("Impression for {ad_id}: {success}");
    }

    client.close();
    Ok(())
}
