// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Browser upload page served at `/`

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Vision &amp; Text Model: Image Description and Story Generator</title>
  <style>
    body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; line-height: 1.5; }
    img { max-width: 100%; display: block; margin: 1rem 0; }
    .status { color: #555; font-style: italic; }
    .error { color: #b00020; }
    pre { white-space: pre-wrap; font-family: inherit; }
  </style>
</head>
<body>
  <h1>Vision &amp; Text Model: Image Description and Story Generator</h1>
  <form id="upload">
    <input type="file" name="image" accept="image/png,image/jpeg" required>
    <button type="submit">Upload</button>
  </form>
  <p id="status" class="status"></p>
  <figure id="figure" hidden>
    <img id="preview" alt="Uploaded image">
    <figcaption>Uploaded Image (Resized)</figcaption>
  </figure>
  <section id="description-section" hidden>
    <h3>Image Description</h3>
    <pre id="description"></pre>
  </section>
  <section id="story-section" hidden>
    <h3>Generated Story</h3>
    <pre id="story"></pre>
  </section>
  <script>
    const form = document.getElementById("upload");
    const status = document.getElementById("status");
    form.addEventListener("submit", async (event) => {
      event.preventDefault();
      for (const id of ["figure", "description-section", "story-section"]) {
        document.getElementById(id).hidden = true;
      }
      status.className = "status";
      status.textContent = "Generating image description and story...";
      try {
        const response = await fetch("/v1/story", { method: "POST", body: new FormData(form) });
        const body = await response.json();
        if (!response.ok) {
          throw new Error(body.message || response.statusText);
        }
        document.getElementById("preview").src = body.image.url;
        document.getElementById("description").textContent = body.description;
        document.getElementById("story").textContent = body.story;
        for (const id of ["figure", "description-section", "story-section"]) {
          document.getElementById(id).hidden = false;
        }
        status.textContent = "";
      } catch (err) {
        status.className = "error";
        status.textContent = "Failed: " + err.message;
      }
    });
  </script>
</body>
</html>
"#;
