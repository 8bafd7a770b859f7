use docstore::impls::mem_kv::MemKv;
use docstore::DocStore;
use docstore::StoreConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = DocStore::new(MemKv::new(), StoreConfig::default().with_page_size(10));

    // Write two revisions of one document
    let v1 = store.put_revision("readme", &b"hello"[..]).await?;
    let v2 = store.put_revision("readme", &b"hello, world"[..]).await?;
    println!("wrote {} then {} (previous: {:?})", v1.id, v2.id, v2.previous_revision);

    // Another document
    store.put_revision("notes", &b"todo"[..]).await?;

    // Read the latest revision
    let latest = store.get_doc("readme").await?;
    println!(
        "latest of readme: {}: {}",
        latest.id(),
        String::from_utf8_lossy(latest.body())
    );

    // Walk the history back to the first revision
    let mut cur = latest.previous_revision().cloned();
    while let Some(id) = cur {
        let rev = store.get_revision("readme", &id).await?;
        println!("  {}: {}", id, String::from_utf8_lossy(rev.body()));
        cur = rev.previous_revision().cloned();
    }

    // Enumerate documents
    let page = store.list_docs("").await?;
    for doc in page.docs {
        println!(
            "doc {}: {} revisions, latest {:?}",
            doc.id, doc.revision_count, doc.latest_revision
        );
    }

    Ok(())
}
