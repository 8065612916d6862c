// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pipeline happy-path tests driven by a scripted inference double

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::support::{png_bytes, test_config, EchoChat, ScriptedChat};
use vision_storyteller::inference::{
    ContentPart, MessageContent, Role, DESCRIBE_PROMPT, STORY_SYSTEM_PROMPT,
};
use vision_storyteller::pipeline::{Pipeline, UploadedImage};

const DESCRIPTION: &str = "A golden retriever leaps after a red frisbee on a sunny beach.";
const STORY: &str = "Once upon a time, a dog named Sunny loved the sea.";

#[tokio::test]
async fn test_run_describes_then_tells_a_story() {
    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::describing(DESCRIPTION, STORY));
    let pipeline = Pipeline::new(&test_config(dir.path()), chat.clone());

    let upload = UploadedImage::new(png_bytes(1600, 1200), "dog.png").with_content_type("image/png");
    let output = pipeline.run(upload).await.unwrap();

    assert_eq!(output.description, DESCRIPTION);
    assert_eq!(output.story, STORY);
    assert_eq!(output.vision_model, "vision-test");
    assert_eq!(output.text_model, "text-test");
    assert_eq!((output.image.width, output.image.height), (800, 600));
    assert_eq!((output.image.original_width, output.image.original_height), (1600, 1200));
    assert!(output.image.path.starts_with(dir.path()));
    assert!(output.image.path.exists());

    let requests = chat.requests();
    assert_eq!(requests.len(), 2);

    // Vision call: one user message, prompt then JPEG-framed data URL of the persisted file
    let vision = &requests[0];
    assert_eq!(vision.model, "vision-test");
    assert_eq!(vision.messages.len(), 1);
    assert_eq!(vision.messages[0].role, Role::User);
    let MessageContent::Parts(parts) = &vision.messages[0].content else {
        panic!("vision request should carry content parts");
    };
    assert_eq!(
        parts[0],
        ContentPart::Text {
            text: DESCRIBE_PROMPT.to_string()
        }
    );
    let ContentPart::ImageUrl { image_url } = &parts[1] else {
        panic!("second part should be the image");
    };
    let encoded = image_url
        .url
        .strip_prefix("data:image/jpeg;base64,")
        .expect("data URL framed as JPEG by default");
    assert_eq!(
        STANDARD.decode(encoded).unwrap(),
        std::fs::read(&output.image.path).unwrap()
    );

    // Story call: persona, then the description verbatim
    let story = &requests[1];
    assert_eq!(story.model, "text-test");
    assert_eq!(story.messages.len(), 2);
    assert_eq!(story.messages[0].role, Role::System);
    assert_eq!(story.messages[0].content.as_text(), Some(STORY_SYSTEM_PROMPT));
    assert_eq!(story.messages[1].role, Role::User);
    assert_eq!(story.messages[1].content.as_text(), Some(DESCRIPTION));
}

#[tokio::test]
async fn test_small_images_are_sent_at_original_size() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(&test_config(dir.path()), Arc::new(EchoChat));

    let output = pipeline
        .run(UploadedImage::new(png_bytes(320, 240), "small.png"))
        .await
        .unwrap();

    assert_eq!((output.image.width, output.image.height), (320, 240));
    assert_eq!(output.description, "reply from vision-test");
    assert_eq!(output.story, "reply from text-test");
}

#[tokio::test]
async fn test_configured_mime_and_prompt_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.inference.vision_image_mime = "image/png".to_string();

    let chat = Arc::new(ScriptedChat::describing("d", "s"));
    let pipeline = Pipeline::new(&config, chat.clone()).with_prompt("Name every animal.");
    pipeline
        .run(UploadedImage::new(png_bytes(50, 50), "zoo.png"))
        .await
        .unwrap();

    let json = serde_json::to_value(&chat.requests()[0]).unwrap();
    assert_eq!(json["messages"][0]["content"][0]["text"], "Name every animal.");
    assert!(json["messages"][0]["content"][1]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_identical_filenames_get_private_scratch_paths() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Arc::new(Pipeline::new(&test_config(dir.path()), Arc::new(EchoChat)));

    let bytes = png_bytes(100, 100);
    let (a, b) = tokio::join!(
        pipeline.run(UploadedImage::new(bytes.clone(), "photo.png")),
        pipeline.run(UploadedImage::new(bytes.clone(), "photo.png")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.image.path, b.image.path);
    assert!(a.image.path.exists());
    assert!(b.image.path.exists());
    assert_eq!(
        std::fs::read(&a.image.path).unwrap(),
        std::fs::read(&b.image.path).unwrap()
    );
}

#[tokio::test]
async fn test_rerun_on_identical_input_sends_identical_payload() {
    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::describing("d1", "s1"));
    let pipeline = Pipeline::new(&test_config(dir.path()), chat.clone());
    let bytes = png_bytes(1000, 700);

    pipeline
        .run(UploadedImage::new(bytes.clone(), "same.png"))
        .await
        .unwrap();

    let chat2 = Arc::new(ScriptedChat::describing("d2", "s2"));
    let pipeline2 = Pipeline::new(&test_config(dir.path()), chat2.clone());
    pipeline2
        .run(UploadedImage::new(bytes, "same.png"))
        .await
        .unwrap();

    let first = serde_json::to_value(&chat.requests()[0]).unwrap();
    let second = serde_json::to_value(&chat2.requests()[0]).unwrap();
    assert_eq!(
        first["messages"][0]["content"][1]["image_url"]["url"],
        second["messages"][0]["content"][1]["image_url"]["url"]
    );
}

#[tokio::test]
async fn test_token_totals_saturate_instead_of_overflowing() {
    use vision_storyteller::inference::ChatUsage;

    let heavy = |text: &str| {
        let mut response = crate::support::text_response(text);
        response.usage = Some(ChatUsage {
            prompt_tokens: 0,
            completion_tokens: u32::MAX,
            total_tokens: u32::MAX,
        });
        response
    };

    let dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(ScriptedChat::new(vec![
        Ok(heavy(DESCRIPTION)),
        Ok(heavy(STORY)),
    ]));
    let pipeline = Pipeline::new(&test_config(dir.path()), chat);

    let output = pipeline
        .run(UploadedImage::new(png_bytes(32, 32), "dog.png"))
        .await
        .unwrap();
    assert_eq!(output.tokens_used, u32::MAX);
}

#[tokio::test]
async fn test_expired_scratch_images_are_pruned_on_next_run() {
    use std::time::{Duration, SystemTime};

    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("old-upload.png");
    std::fs::write(&stale, png_bytes(4, 4)).unwrap();
    std::fs::File::options()
        .write(true)
        .open(&stale)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(2 * 60 * 60))
        .unwrap();
    let recent = dir.path().join("recent-upload.png");
    std::fs::write(&recent, png_bytes(4, 4)).unwrap();

    let mut config = test_config(dir.path());
    config.image.scratch_ttl_secs = 60 * 60;
    let pipeline = Pipeline::new(&config, Arc::new(EchoChat));

    let output = pipeline
        .run(UploadedImage::new(png_bytes(32, 32), "dog.png"))
        .await
        .unwrap();

    assert!(!stale.exists());
    assert!(recent.exists());
    assert!(output.image.path.exists());
}

#[tokio::test]
async fn test_zero_ttl_keeps_scratch_images() {
    use std::time::{Duration, SystemTime};

    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("old-upload.png");
    std::fs::write(&stale, png_bytes(4, 4)).unwrap();
    std::fs::File::options()
        .write(true)
        .open(&stale)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(30 * 24 * 60 * 60))
        .unwrap();

    let mut config = test_config(dir.path());
    config.image.scratch_ttl_secs = 0;
    let pipeline = Pipeline::new(&config, Arc::new(EchoChat));

    let output = pipeline
        .run(UploadedImage::new(png_bytes(16, 16), "a.png"))
        .await
        .unwrap();

    assert!(stale.exists());
    assert!(output.image.path.exists());
}
