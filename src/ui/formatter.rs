//! Pure formatting functions for UI output.
//!
//! Status lines go to stdout, errors and warnings to stderr. Styling is
//! dropped automatically when the stream is not a terminal.

use crate::boundary::BoundaryWarning;
use crate::domain::Image;
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().for_stderr(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow().for_stderr(), warning);
}

/// Display the resolved project image and whether it must be built.
pub fn display_image(image: &Image) {
    println!("{}", style("Project image:").bold());
    println!("  {}", style(image.url()).cyan());
    if image.in_registry {
        println!("  in registry, no build required");
    } else {
        println!("  {}", style("not in registry, build required").yellow());
    }
}

/// Display the proposed release tag and the commands creating it.
///
/// # Arguments
/// * `current` - Current version of HEAD
/// * `new_tag` - Release tag computed from it
/// * `commands` - Equivalent git commands
pub fn display_proposed_tag(current: &str, new_tag: &str, commands: &[String]) {
    println!("\n{}", style("Proposed Tag:").bold());
    println!("  From: {}", style(current).red());
    println!("  To:   {}", style(new_tag).green());
    println!("\n{}", style("Commands:").bold());
    for command in commands {
        println!("  {}", style(command).cyan());
    }
}

/// Display dependencies and the branch each one is worked on.
pub fn display_dependencies(lines: &[(String, Option<String>)]) {
    if lines.is_empty() {
        println!("No dependencies selected");
        return;
    }
    println!("{}", style("Dependencies:").bold());
    for (dependency, branch) in lines {
        match branch {
            Some(branch) => println!("  {} {}", dependency, style(branch).green()),
            None => println!("  {}", dependency),
        }
    }
}
