use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use crate::unsplash::UnsplashClient;
use crate::usda::UsdaClient;

use super::helpers::{exit_not_found, print_json, truncate};

pub(crate) async fn cmd_lookup(usda: &UsdaClient, query: &str, json: bool) -> Result<()> {
    let Some(facts) = usda.lookup(query).await? else {
        exit_not_found(&format!("No nutrition data found for '{query}'"), json);
    };

    if json {
        return print_json(&facts);
    }
    let (name, cal) = (&facts.name, facts.calories);
    let (p, c, f) = (facts.protein_g, facts.carbs_g, facts.fat_g);
    println!("{name}: {cal} kcal | P:{p}g C:{c}g F:{f}g");
    println!("\nLog it with: fullsnack log \"{name}\" --lookup");
    Ok(())
}

pub(crate) async fn cmd_images(
    unsplash: Option<&UnsplashClient>,
    query: &str,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct ImageRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Description")]
        alt: String,
        #[tabled(rename = "Photographer")]
        credit: String,
        #[tabled(rename = "URL")]
        url: String,
    }

    let Some(client) = unsplash else {
        bail!("UNSPLASH_ACCESS_KEY is not set");
    };
    let images = client.preview(query).await?;

    if json {
        return print_json(&images);
    }
    if images.is_empty() {
        exit_not_found(&format!("No images found for '{query}'"), false);
    }

    let rows: Vec<ImageRow> = images
        .iter()
        .enumerate()
        .map(|(i, img)| ImageRow {
            idx: i + 1,
            alt: truncate(&img.alt, 40),
            credit: img.credit.name.clone().unwrap_or_default(),
            url: img.full.clone().unwrap_or_default(),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
