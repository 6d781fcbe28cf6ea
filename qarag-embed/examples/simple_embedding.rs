//! Embeds a few checkout-related sentences and prints their pairwise similarity

use qarag_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider, cosine_similarity};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = EmbedConfig::default().with_batch_size(2);
    println!("Model: {}", config.model_name);
    println!("Batch size: {}", config.batch_size);

    let provider = FastEmbedProvider::create(config).await?;
    println!(
        "Provider {} ready, dimension {}",
        provider.provider_name(),
        provider.embedding_dimension()
    );

    let texts = vec![
        "Enter the discount code and press apply.".to_string(),
        "A valid coupon lowers the order total.".to_string(),
        "Shipping is free for orders over fifty dollars.".to_string(),
    ];
    let result = provider.embed_texts(&texts).await?;

    for (i, a) in result.embeddings.iter().enumerate() {
        for (j, b) in result.embeddings.iter().enumerate().skip(i + 1) {
            println!(
                "{:.3}  \"{}\" <-> \"{}\"",
                cosine_similarity(a, b),
                texts[i],
                texts[j]
            );
        }
    }

    Ok(())
}
