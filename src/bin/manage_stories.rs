use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row as PrettyRow, Table};

use truthlens::db::Database;
use truthlens::environment::Settings;
use truthlens::filter::types::{BiasRating, CurationStatus, FactualReporting, RawArticle};
use truthlens::filter::{ArticleScoringPipeline, RatingUpdate};
use truthlens::logging::configure_logging;
use truthlens::util::truncate_chars;
use truthlens::viral::types::ViralNewsStory;
use truthlens::viral::{CrossSourceVerifier, ViralClusterDetector};

#[derive(Parser)]
#[clap(name = "manage-stories", about = "Score articles and manage viral stories")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest and score a JSON array of raw articles
    Ingest {
        /// Path to the JSON file
        #[clap(required = true)]
        file: String,
    },

    /// Run one viral detection pass
    Detect,

    /// Verify one story, or the pending batch when no ID is given
    Verify {
        /// Story ID
        #[clap(short, long)]
        id: Option<String>,

        /// Maximum number of pending stories to verify
        #[clap(short, long)]
        limit: Option<i64>,
    },

    /// List viral stories, most viral first
    ListStories {
        #[clap(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show a story with its claims, evidence and fact-checks
    ShowStory {
        #[clap(required = true)]
        id: String,
    },

    /// Record a fact-check rating and re-verify the story
    AddFactCheck {
        #[clap(required = true)]
        story_id: String,

        /// Fact-checker ID (snopes, politifact, factcheck_org, afp, reuters, fullfact, altnews, boom)
        #[clap(required = true)]
        source: String,

        #[clap(required = true)]
        url: String,

        /// The organisation's own rating label
        #[clap(required = true)]
        rating: String,

        #[clap(short, long, default_value = "")]
        summary: String,
    },

    /// List sources by credibility
    Sources {
        #[clap(short, long, default_value = "50")]
        limit: i64,
    },

    /// Set a source's credibility rating manually
    SetSource {
        #[clap(required = true)]
        name: String,

        /// Overall score (0-100)
        #[clap(short, long)]
        score: u8,

        /// left, center-left, center, center-right, right or unknown
        #[clap(short, long, default_value = "unknown")]
        bias: String,

        /// very-high, high, mixed, low, very-low or unknown
        #[clap(short, long, default_value = "unknown")]
        factual: String,
    },

    /// Seed the curated source ratings
    InitSources,

    /// List articles, optionally by curation status
    Articles {
        #[clap(short, long)]
        status: Option<String>,

        #[clap(short, long, default_value = "20")]
        limit: i64,
    },

    /// Override an article's curation status
    Curate {
        #[clap(required = true)]
        article_id: i64,

        /// pending, approved, rejected or flagged
        #[clap(required = true)]
        status: String,

        #[clap(short, long, default_value = "operator")]
        by: String,

        #[clap(short, long)]
        notes: Option<String>,
    },

    /// Re-run scoring on a stored article
    Rescore {
        #[clap(required = true)]
        article_id: i64,
    },

    /// Deactivate articles published more than the given number of days ago
    Prune {
        #[clap(short, long, default_value = "30")]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    configure_logging("manage_stories", &settings.log_dir);

    let args = Cli::parse();
    let db = Database::new(&settings.database_path).await?;
    let pipeline = ArticleScoringPipeline::from_settings(db.clone(), &settings);
    let verifier = CrossSourceVerifier::from_settings(db.clone(), &settings);

    match args.command {
        Commands::Ingest { file } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file))?;
            let articles: Vec<RawArticle> = serde_json::from_str(&raw)?;
            let summary = pipeline.ingest_batch(articles).await?;
            println!(
                "Scored {}, skipped {} duplicates, rejected {}",
                summary.scored, summary.duplicates, summary.rejected
            );
        }
        Commands::Detect => {
            let created = ViralClusterDetector::from_settings(db.clone(), &settings)
                .detect()
                .await?;
            println!("Created {} new stories", created.len());
            print_stories(&created);
        }
        Commands::Verify { id, limit } => {
            let verified = match id {
                Some(id) => vec![verifier.verify(&id).await?],
                None => {
                    verifier
                        .verify_pending(
                            limit.unwrap_or(settings.verify_batch_limit),
                            settings.verify_min_virality,
                        )
                        .await?
                }
            };
            print_stories(&verified);
        }
        Commands::ListStories { limit } => {
            print_stories(&db.list_stories(limit).await?);
        }
        Commands::ShowStory { id } => match db.get_story(&id).await? {
            Some(story) => show_story(&story),
            None => bail!("No story with ID {}", id),
        },
        Commands::AddFactCheck {
            story_id,
            source,
            url,
            rating,
            summary,
        } => {
            let story = verifier
                .add_fact_check(&story_id, &source, &url, &rating, &summary)
                .await?;
            show_story(&story);
        }
        Commands::Sources { limit } => {
            let mut table = Table::new();
            table.add_row(PrettyRow::new(vec![
                Cell::new("Name"),
                Cell::new("Score"),
                Cell::new("Bias"),
                Cell::new("Factual"),
                Cell::new("Rating"),
                Cell::new("Articles"),
            ]));
            for source in db.list_sources(limit).await? {
                let rating = &source.credibility_rating;
                table.add_row(PrettyRow::new(vec![
                    Cell::new(&source.name),
                    Cell::new(&rating.overall_score.to_string()),
                    Cell::new(&rating.bias_rating.to_string()),
                    Cell::new(&rating.factual_reporting.to_string()),
                    Cell::new(&rating.rating_source.to_string()),
                    Cell::new(&source.article_count.to_string()),
                ]));
            }
            table.printstd();
        }
        Commands::SetSource {
            name,
            score,
            bias,
            factual,
        } => {
            if score > 100 {
                bail!("Score must be between 0 and 100");
            }
            let source = pipeline
                .credibility_store()
                .update(
                    &name,
                    RatingUpdate {
                        overall_score: score,
                        bias_rating: BiasRating::from(bias.as_str()),
                        factual_reporting: FactualReporting::from(factual.as_str()),
                        rating_source: None,
                    },
                )
                .await?;
            println!(
                "{}: {} ({}, {})",
                source.name,
                source.credibility_rating.overall_score,
                source.credibility_rating.bias_rating,
                source.credibility_rating.factual_reporting
            );
        }
        Commands::InitSources => {
            let seeded = pipeline.credibility_store().initialize_defaults().await?;
            println!("Seeded {} curated sources", seeded);
        }
        Commands::Articles { status, limit } => {
            let status = status.as_deref().map(CurationStatus::from);
            let mut table = Table::new();
            table.add_row(PrettyRow::new(vec![
                Cell::new("ID"),
                Cell::new("Published"),
                Cell::new("Source"),
                Cell::new("Score"),
                Cell::new("Status"),
                Cell::new("Title"),
            ]));
            for article in db.list_articles(status, limit, 0).await? {
                table.add_row(PrettyRow::new(vec![
                    Cell::new(&article.id.to_string()),
                    Cell::new(&local_time(&article.published_at)),
                    Cell::new(&article.source_name),
                    Cell::new(&article.overall_score().to_string()),
                    Cell::new(&article.curation.status.to_string()),
                    Cell::new(truncate_chars(&article.title, 60)),
                ]));
            }
            table.printstd();
        }
        Commands::Curate {
            article_id,
            status,
            by,
            notes,
        } => {
            let status = CurationStatus::from(status.as_str());
            pipeline
                .curate(article_id, status, &by, notes.as_deref())
                .await?;
            println!("Article {} marked {}", article_id, status);
        }
        Commands::Rescore { article_id } => {
            let scored = pipeline.reprocess(article_id).await?;
            println!(
                "Article {}: score {} ({}), categories: {}",
                article_id,
                scored.filtering.overall_score,
                scored.curation_status,
                scored.categories.join(", ")
            );
        }
        Commands::Prune { days } => {
            let deactivated = pipeline.deactivate_older_than(days).await?;
            println!("Deactivated {} articles", deactivated);
        }
    }

    db.close().await;
    Ok(())
}

fn local_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn print_stories(stories: &[ViralNewsStory]) {
    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("ID"),
        Cell::new("Detected"),
        Cell::new("Virality"),
        Cell::new("Sources"),
        Cell::new("Status"),
        Cell::new("Confidence"),
        Cell::new("Title"),
    ]));

    for story in stories {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&story.id),
            Cell::new(&local_time(&story.virality.first_detected)),
            Cell::new(&format!("{:.1}", story.virality.score)),
            Cell::new(&story.virality.sources_count.to_string()),
            Cell::new(&story.verification.status.to_string()),
            Cell::new(&story.verification.confidence_score.to_string()),
            Cell::new(truncate_chars(&story.title, 60)),
        ]));
    }

    table.printstd();
}

fn show_story(story: &ViralNewsStory) {
    println!("{}", story.title);
    println!("  ID:          {}", story.id);
    println!("  Summary:     {}", story.summary);
    println!("  Keywords:    {}", story.keywords.join(", "));
    println!(
        "  Virality:    {:.1} ({} sources, {:.2} articles/hour)",
        story.virality.score, story.virality.sources_count, story.virality.velocity
    );
    println!(
        "  Status:      {} ({}% confidence)",
        story.verification.status, story.verification.confidence_score
    );
    if let Some(checked) = &story.verification.last_checked {
        println!("  Last check:  {}", local_time(checked));
    }
    let misinformation = &story.misinformation_analysis;
    if !misinformation.flags.is_empty() {
        println!(
            "  Risk:        {} ({})",
            misinformation.risk_score,
            misinformation.flags.join("; ")
        );
    }

    if !story.claims.is_empty() {
        let mut claims = Table::new();
        claims.add_row(PrettyRow::new(vec![
            Cell::new("Type"),
            Cell::new("Status"),
            Cell::new("Confidence"),
            Cell::new("Evidence"),
            Cell::new("Claim"),
        ]));
        for claim in &story.claims {
            let supporting = claim.verification.evidence.iter().filter(|e| e.supports).count();
            claims.add_row(PrettyRow::new(vec![
                Cell::new(&format!("{:?}", claim.claim_type).to_lowercase()),
                Cell::new(&claim.verification.status.to_string()),
                Cell::new(&claim.verification.confidence_score.to_string()),
                Cell::new(&format!("{}/{}", supporting, claim.verification.evidence.len())),
                Cell::new(truncate_chars(&claim.text, 80)),
            ]));
        }
        claims.printstd();
    }

    if !story.fact_checks.is_empty() {
        let mut checks = Table::new();
        checks.add_row(PrettyRow::new(vec![
            Cell::new("Checker"),
            Cell::new("Rating"),
            Cell::new("Normalized"),
            Cell::new("URL"),
        ]));
        for check in &story.fact_checks {
            checks.add_row(PrettyRow::new(vec![
                Cell::new(&check.source),
                Cell::new(&check.rating),
                Cell::new(&format!("{:?}", check.normalized_rating)),
                Cell::new(&check.url),
            ]));
        }
        checks.printstd();
    }

    let mut related = Table::new();
    related.add_row(PrettyRow::new(vec![
        Cell::new("Article"),
        Cell::new("Source"),
        Cell::new("Published"),
        Cell::new("Score"),
        Cell::new("Title"),
    ]));
    for article in &story.related_articles {
        related.add_row(PrettyRow::new(vec![
            Cell::new(&article.article_id.to_string()),
            Cell::new(&article.source),
            Cell::new(&local_time(&article.published_at)),
            Cell::new(&article.credibility_score.to_string()),
            Cell::new(truncate_chars(&article.title, 60)),
        ]));
    }
    related.printstd();
}
