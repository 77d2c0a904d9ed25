use vergen_gitcl::{Emitter, Gitcl};

// Only the git branch, short sha and dirty flag are read back by
// `src/version.rs`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let git = Gitcl::builder().branch(true).sha(true).dirty(true).build();
    Emitter::default().add_instructions(&git)?.emit()?;
    Ok(())
}
