// Shared by the bench targets in this directory; each target uses a subset.

#[allow(dead_code)]
pub fn generate_markdown_outline(sections: usize, depth: usize) -> String {
    generate_outline('#', sections, depth.min(6))
}

#[allow(dead_code)]
pub fn generate_org_outline(sections: usize, depth: usize) -> String {
    generate_outline('*', sections, depth)
}

#[allow(dead_code)]
fn generate_outline(marker: char, sections: usize, depth: usize) -> String {
    let mut content = String::new();
    for section in 0..sections {
        for level in 1..=depth.max(1) {
            let stars = marker.to_string().repeat(level);
            content.push_str(&format!("{stars} Section {section} level {level}\n"));
            content.push_str("Some body text for this section.\n\n");
            if level % 2 == 0 {
                content.push_str("- first item\n- second item\n\n");
            }
        }
    }
    content
}
