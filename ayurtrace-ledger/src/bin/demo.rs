//! Walk-through of a herb batch from harvest to consumer trace

use anyhow::Context;
use ayurtrace_ledger::{
    summarize_or_fallback, Actor, CollectionEvent, Config, Event, GeoLocation, HarvestMethod,
    HttpSummarizer, Ledger, OfflineSummarizer, ProcessType, ProcessingEvent, QualityParameters,
    QualityTestEvent, Submission, Summarizer, UserRole,
};

const SPECIES: [&str; 5] = [
    "Withania somnifera (Ashwagandha)",
    "Ocimum sanctum (Tulsi)",
    "Curcuma longa (Turmeric)",
    "Emblica officinalis (Amla)",
    "Bacopa monnieri (Brahmi)",
];

struct Participant {
    actor: Actor,
    location: &'static str,
}

fn participants() -> [Participant; 4] {
    [
        Participant {
            actor: Actor::new("u1", "Ramesh Gupta", UserRole::Farmer),
            location: "Madhya Pradesh",
        },
        Participant {
            actor: Actor::new("u2", "Dr. Priya Singh", UserRole::LabTechnician),
            location: "AyurLab Delhi",
        },
        Participant {
            actor: Actor::new("u3", "PureGreens Processing", UserRole::Processor),
            location: "Pune",
        },
        Participant {
            actor: Actor::new("u4", "Anjali (Customer)", UserRole::Consumer),
            location: "Mumbai",
        },
    ]
}

async fn submit(ledger: &Ledger, event: Event) -> anyhow::Result<Option<String>> {
    let role = event.actor().role;
    if !role.can_record(event.kind()) {
        println!("  {} portal cannot record a {}", role, event.kind());
        return Ok(None);
    }

    let id = event.id().to_string();
    match ledger.submit(event).await? {
        Submission::Appended(block) => {
            println!(
                "  block #{} {} (signed {})",
                block.index, block.hash, block.validator_signature
            );
            Ok(Some(id))
        }
        Submission::Rejected(rejection) => {
            println!("  {}", rejection.user_message());
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting AyurTrace demo");

    let config = Config::from_env().context("loading configuration")?;
    let summarizer: Box<dyn Summarizer> = match &config.summary.endpoint {
        Some(endpoint) => Box::new(HttpSummarizer::new(
            endpoint.clone(),
            config.summary.timeout_secs,
        )?),
        None => Box::new(OfflineSummarizer),
    };

    let ledger = Ledger::open(config).await?;
    let [farmer, lab, processor, consumer] = participants();

    println!("Farmer {} ({})", farmer.actor.name, farmer.location);
    let harvest = CollectionEvent::new(
        farmer.actor.clone(),
        SPECIES[0],
        "Root",
        100.0,
        GeoLocation::new(23.47, 77.94),
        HarvestMethod::Cultivated,
    );
    let batch_id = submit(&ledger, harvest.into())
        .await?
        .context("harvest should satisfy the contract")?;

    println!("Farmer {} over-harvests", farmer.actor.name);
    let greedy = CollectionEvent::new(
        farmer.actor.clone(),
        SPECIES[1],
        "Leaf",
        600.0,
        GeoLocation::new(23.47, 77.94),
        HarvestMethod::WildCrafted,
    );
    submit(&ledger, greedy.into()).await?;

    println!("Farmer {} reports from outside India", farmer.actor.name);
    let abroad = CollectionEvent::new(
        farmer.actor.clone(),
        SPECIES[2],
        "Rhizome",
        50.0,
        GeoLocation::new(51.5, -0.12),
        HarvestMethod::Cultivated,
    );
    submit(&ledger, abroad.into()).await?;

    println!("Lab {} ({})", lab.actor.name, lab.location);
    let damp = QualityTestEvent::new(
        lab.actor.clone(),
        batch_id.clone(),
        QualityParameters {
            moisture_content: 14.5,
            pesticides_detected: false,
            heavy_metals_passed: true,
            dna_verified: true,
        },
    );
    submit(&ledger, damp.into()).await?;

    let certificate = QualityTestEvent::new(
        lab.actor.clone(),
        batch_id.clone(),
        QualityParameters {
            moisture_content: 8.5,
            pesticides_detected: false,
            heavy_metals_passed: true,
            dna_verified: true,
        },
    );
    submit(&ledger, certificate.into()).await?;

    println!("Processor {} ({})", processor.actor.name, processor.location);
    for (step, temperature) in [(ProcessType::Drying, Some(45.0)), (ProcessType::Packaging, None)] {
        let event = ProcessingEvent::new(
            processor.actor.clone(),
            batch_id.clone(),
            step,
            processor.location,
            temperature,
        );
        submit(&ledger, event.into()).await?;
    }

    println!("Consumer {} ({})", consumer.actor.name, consumer.location);
    let impostor = CollectionEvent::new(
        consumer.actor.clone(),
        SPECIES[3],
        "Fruit",
        5.0,
        GeoLocation::new(19.07, 72.88),
        HarvestMethod::WildCrafted,
    );
    submit(&ledger, impostor.into()).await?;

    for identifier in [batch_id.as_str(), "COL-0"] {
        let trace = ledger.trace(identifier);
        if trace.is_empty() {
            println!("  {}: not found on the ledger", identifier);
            continue;
        }

        let projection = trace.projection();
        for entry in &projection {
            println!("  {} {} by {}", entry.date, entry.kind, entry.details.actor().name);
        }

        let card = summarize_or_fallback(summarizer.as_ref(), &projection).await;
        println!("  authenticity {}/10: {}", card.authenticity_score, card.summary);
        for highlight in &card.sustainability_highs {
            println!("    - {}", highlight);
        }
    }

    ledger.verify().context("chain failed verification")?;
    let metrics = ledger.metrics();
    tracing::info!(
        blocks = ledger.chain().len(),
        appended = metrics.blocks_appended.get(),
        rejected = metrics.rejections.get(),
        "Chain verified"
    );

    ledger.shutdown().await?;
    Ok(())
}
