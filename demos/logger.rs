use logrollover::{MaxSize, RollingWriterBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = RollingWriterBuilder::new("./logs/logger.log")
        .max_size(MaxSize::KB(4)) // Archive once the file exceeds 4KB
        .build();

    // Enough writes to grow past the threshold and trigger an archive swap
    // at one of the periodic size checks.
    for i in 1..=1000 {
        let entry = format!("Log entry #{i}: a sample message that contributes to file size");
        logger.write_line(entry.as_str())?;
    }

    println!(
        "active: {}, archive: {}",
        logger.active_path().display(),
        logger.archive_path().display()
    );

    Ok(())
}
