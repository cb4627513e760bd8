use banao_contracts::aspect::AspectRatio;

const TASK_CLAUSES: &[&str] = &[
    "You are an expert photo editor. Your task is to combine two images. The first image contains the main subject (a person). The second image contains a style reference (e.g., clothes, an accessory like a bag, or a vehicle).",
    "You must seamlessly integrate the main subject from the first image into the context of the second image. Specifically:",
    "- If the second image features clothing, redraw the person from the first image wearing that clothing.",
    "- If the second image features an accessory like a handbag, redraw the person from the first image holding it.",
    "- If the second image features a vehicle like a car or bike, redraw the person from the first image sitting in or on it.",
    "The final image should be photorealistic and cohesive. The background and overall style should be inspired by the second image.",
    "Output only the final edited image without any text.",
];

pub fn aspect_ratio_clause(aspect_ratio: AspectRatio) -> String {
    if aspect_ratio.is_original() {
        return "Match the aspect ratio of the first input image (the person).".to_string();
    }
    format!(
        "The final output image must have a {} aspect ratio.",
        aspect_ratio.label()
    )
}

/// Text part sent after the two images; depends only on the aspect ratio.
pub fn composite_instruction(aspect_ratio: AspectRatio) -> String {
    let mut lines: Vec<String> = TASK_CLAUSES.iter().map(|line| line.to_string()).collect();
    lines.push(format!(
        "Aspect ratio instruction: {}",
        aspect_ratio_clause(aspect_ratio)
    ));
    lines.join("\n")
}
