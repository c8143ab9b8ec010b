//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgb, RgbImage};

/// A PNG with noisy pixels so the encoded size stays well above the payload minimum
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let img = RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("encode sample png");
    out.into_inner()
}

pub fn sample_png_base64(width: u32, height: u32) -> String {
    STANDARD.encode(sample_png(width, height))
}

/// Table markup with one header row and `rows` body rows of `columns` cells
pub fn table_markup(columns: usize, rows: usize) -> String {
    let mut out = String::from("<Table>");
    for r in 0..=rows {
        out.push_str("<Row>");
        for c in 0..columns {
            if r == 0 {
                out.push_str(&format!("<Cell><OE><T>Col {c}</T></OE></Cell>"));
            } else {
                out.push_str(&format!("<Cell><OE><T>r{r}c{c}</T></OE></Cell>"));
            }
        }
        out.push_str("</Row>");
    }
    out.push_str("</Table>");
    out
}

/// A page mixing headings, list items, a table and an image
pub fn sample_page(title: &str, table_columns: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<one:Page xmlns:one="http://schemas.microsoft.com/office/onenote/2013/onenote" name="{title}">
  <one:Title><one:OE><one:T><![CDATA[{title}]]></one:T></one:OE></one:Title>
  <one:Outline>
    <one:OEChildren>
      <one:OE><one:T><![CDATA[<span style='font-weight:bold'>Agenda</span>]]></one:T></one:OE>
      <one:OE><one:List indent="1"/><one:T>Review budget &amp; timeline</one:T></one:OE>
      <one:OE><one:T>项目进度 – 第一阶段</one:T></one:OE>
      <one:OE>{table}</one:OE>
      <one:OE><one:Image format="png"><one:Size width="64" height="48"/><one:Data>{image}</one:Data></one:Image></one:OE>
      <one:OE><one:T>Closing notes</one:T></one:OE>
    </one:OEChildren>
  </one:Outline>
</one:Page>"#,
        table = table_markup(table_columns, 3),
        image = sample_png_base64(64, 48),
    )
}
