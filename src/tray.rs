use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use image::{ImageBuffer, Rgba, RgbaImage};
use tracing::warn;
use tray_icon::{
    Icon, TrayIcon, TrayIconBuilder,
    menu::{CheckMenuItem, Menu, MenuItem, PredefinedMenuItem},
};

use crate::platform::Os;
use crate::state::TrayState;
use crate::tier::Tier;

const ICON_SIZE: u32 = 22;
const OUTLINE: [u8; 3] = [128, 128, 128];

/// Fill color for each tier.
fn tier_rgb(tier: Tier) -> [u8; 3] {
    match tier {
        Tier::Green => [76, 175, 80],
        Tier::Yellow => [255, 235, 59],
        Tier::Orange => [255, 152, 0],
        Tier::Red => [244, 67, 54],
    }
}

/// Holds references to menu items that can be updated dynamically.
pub struct MenuItems {
    pub status_item: MenuItem,
    pub time_item: MenuItem,
    pub alert_item: MenuItem,
    pub notifications_item: CheckMenuItem,
    pub edit_item: MenuItem,
    pub reload_item: MenuItem,
    pub quit_item: MenuItem,
}

/// Build the tray dropdown menu and return both the menu and item handles.
pub fn build_menu(view: &TrayState, now: DateTime<Utc>) -> (Menu, MenuItems) {
    let menu = Menu::new();

    let status_item = MenuItem::new(view.status_text(), false, None);
    let time_item = MenuItem::new(view.time_text(), false, None);
    let alert_item = MenuItem::new(view.last_alert_text(now), false, None);
    let notifications_item = CheckMenuItem::new("Notifications", true, view.notifications_enabled, None);
    let edit_item = MenuItem::new("Edit Profile...", true, None);
    let reload_item = MenuItem::new("Reload Profile", true, None);
    let quit_item = MenuItem::new("Quit", true, None);

    let _ = menu.append_items(&[
        &status_item,
        &time_item,
        &PredefinedMenuItem::separator(),
        &alert_item,
        &notifications_item,
        &PredefinedMenuItem::separator(),
        &edit_item,
        &reload_item,
        &quit_item,
    ]);

    let items = MenuItems {
        status_item,
        time_item,
        alert_item,
        notifications_item,
        edit_item,
        reload_item,
        quit_item,
    };

    (menu, items)
}

/// Rewrite the informational lines of the menu.
pub fn refresh_menu(items: &MenuItems, view: &TrayState, now: DateTime<Utc>) {
    items.status_item.set_text(view.status_text());
    items.time_item.set_text(view.time_text());
    items.alert_item.set_text(view.last_alert_text(now));
    items.notifications_item.set_checked(view.notifications_enabled);
}

/// Draw a horizontal battery: grey outline and terminal, interior filled
/// left to right in the tier color. A white plus marks charging. `opacity`
/// fades everything but the outline.
pub fn battery_pixels(percentage: u8, tier: Tier, charging: bool, opacity: f32) -> RgbaImage {
    let (x0, x1, y0, y1) = (1u32, 17u32, 5u32, 16u32);
    let (inner_x0, inner_x1) = (x0 + 2, x1 - 2);
    let inner_width = inner_x1 - inner_x0 + 1;
    let filled = (inner_width * u32::from(percentage.min(100)) + 50) / 100;
    let alpha = (255.0 * opacity.clamp(0.0, 1.0)).round() as u8;
    let [r, g, b] = tier_rgb(tier);

    ImageBuffer::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let in_body = (x0..=x1).contains(&x) && (y0..=y1).contains(&y);
        let on_outline = in_body && (x == x0 || x == x1 || y == y0 || y == y1);
        let on_nub = (x1 + 1..=x1 + 3).contains(&x) && (8..=13).contains(&y);
        let in_inner = (inner_x0..=inner_x1).contains(&x) && (y0 + 2..=y1 - 2).contains(&y);
        let on_plus = ((10..=11).contains(&y) && (6..=12).contains(&x))
            || ((8..=10).contains(&x) && (8..=13).contains(&y));

        if on_outline || on_nub {
            let [r, g, b] = OUTLINE;
            Rgba([r, g, b, 255])
        } else if charging && in_inner && on_plus {
            Rgba([255, 255, 255, alpha])
        } else if in_inner && x < inner_x0 + filled {
            Rgba([r, g, b, alpha])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

pub fn battery_icon(view: &TrayState, opacity: f32) -> Option<Icon> {
    let percentage = view.reading.percentage;
    let img = battery_pixels(
        percentage,
        Tier::from_percentage(percentage),
        view.reading.is_charging(),
        opacity,
    );
    let (width, height) = img.dimensions();
    match Icon::from_rgba(img.into_raw(), width, height) {
        Ok(icon) => Some(icon),
        Err(e) => {
            warn!(error = %e, "failed to build battery icon");
            None
        }
    }
}

/// Short text shown next to the icon where the platform supports it.
pub fn title_text(view: &TrayState) -> String {
    if view.reading.has_telemetry() {
        format!("{}%", view.reading.percentage)
    } else {
        "--%".into()
    }
}

pub fn build_tray(menu: Menu, icon: Option<Icon>, view: &TrayState) -> tray_icon::Result<TrayIcon> {
    let mut builder = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip(view.tooltip())
        .with_title(title_text(view))
        .with_menu_on_left_click(true);
    if let Some(icon) = icon {
        builder = builder.with_icon(icon);
    }
    builder.build()
}

/// Update the tooltip and title to the latest reading.
pub fn refresh_tray(tray: &TrayIcon, view: &TrayState) {
    let _ = tray.set_tooltip(Some(view.tooltip()));
    tray.set_title(Some(title_text(view)));
}

pub fn update_icon(tray: &TrayIcon, view: &TrayState, opacity: f32) {
    if let Some(icon) = battery_icon(view, opacity) {
        if let Err(e) = tray.set_icon(Some(icon)) {
            warn!(error = %e, "failed to update tray icon");
        }
    }
}

/// Open `path` with the desktop's default handler.
pub fn open_file(os: Os, path: &Path) -> std::io::Result<()> {
    let mut cmd = match os {
        Os::MacOs => Command::new("open"),
        Os::Windows => {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        }
        Os::Linux | Os::Other => Command::new("xdg-open"),
    };
    cmd.arg(path).spawn().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::{BatteryReading, ChargeState};

    fn alpha_at(img: &RgbaImage, x: u32, y: u32) -> u8 {
        img.get_pixel(x, y).0[3]
    }

    #[test]
    fn test_full_battery_fills_interior() {
        let img = battery_pixels(100, Tier::Green, false, 1.0);
        assert_eq!(img.dimensions(), (ICON_SIZE, ICON_SIZE));
        assert_eq!(img.get_pixel(3, 10).0, [76, 175, 80, 255]);
        assert_eq!(img.get_pixel(15, 10).0, [76, 175, 80, 255]);
    }

    #[test]
    fn test_empty_battery_keeps_outline_only() {
        let img = battery_pixels(0, Tier::Red, false, 1.0);
        assert_eq!(alpha_at(&img, 3, 10), 0);
        assert_eq!(img.get_pixel(1, 10).0, [128, 128, 128, 255]);
        assert_eq!(alpha_at(&img, 19, 10), 255);
    }

    #[test]
    fn test_half_fill_stops_midway() {
        let img = battery_pixels(50, Tier::Yellow, false, 1.0);
        assert_eq!(alpha_at(&img, 3, 10), 255);
        assert_eq!(alpha_at(&img, 15, 10), 0);
    }

    #[test]
    fn test_opacity_fades_fill_not_outline() {
        let img = battery_pixels(20, Tier::Red, false, 0.3);
        assert_eq!(alpha_at(&img, 3, 10), 77);
        assert_eq!(alpha_at(&img, 1, 10), 255);
    }

    #[test]
    fn test_charging_draws_plus() {
        let img = battery_pixels(10, Tier::Red, true, 1.0);
        assert_eq!(img.get_pixel(9, 10).0, [255, 255, 255, 255]);
        let plain = battery_pixels(10, Tier::Red, false, 1.0);
        assert_eq!(alpha_at(&plain, 9, 10), 0);
    }

    #[test]
    fn test_title_text() {
        let mut view = TrayState::new(true);
        assert_eq!(title_text(&view), "--%");
        view.set_reading(BatteryReading::new(ChargeState::Discharging, 64, None), Utc::now());
        assert_eq!(title_text(&view), "64%");
    }
}
