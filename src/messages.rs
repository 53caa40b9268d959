//! Chat texts sent back to owners.

use crate::types::{MonitoringRequest, DATE_FORMAT};
use std::fmt::Write;
use std::time::Duration;

pub const ACK: &str = "✅ 收到訊息，開始處理中...";
pub const NO_ACTIVE: &str = "目前沒有進行中的監控任務";

pub const HELP: &str = "📖 使用說明

輸入格式：
[網址] 入住日期 退房日期 [人數]

範例：
2025-12-25 2025-12-27 2
https://hotel.example.com/plan 2025-12-25 2025-12-27

人數預設為 2，範圍 1-10。

其他指令：
• 狀態 (status) - 查看監控狀態
• 停止 (stop) - 停止監控
• 說明 (help) - 查看此說明";

/// "每30分鐘" / "每45秒"
pub fn every(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("每{}分鐘", secs / 60)
    } else {
        format!("每{secs}秒")
    }
}

fn stay(req: &MonitoringRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🏨 {}", req.target.display_name());
    if let Some(room) = &req.room_type {
        let _ = writeln!(out, "🛏️ 房型：{room}");
    }
    let _ = writeln!(out, "📅 入住日期：{}", req.checkin.format(DATE_FORMAT));
    let _ = writeln!(out, "📅 退房日期：{}", req.checkout.format(DATE_FORMAT));
    let _ = write!(out, "👥 入住人數：{}人", req.occupancy.get());
    out
}

/// Scheduler found a room; monitoring for this request is over.
pub fn became_available(req: &MonitoringRequest, url: &str) -> String {
    format!(
        "🎉 好消息！房間有空了！\n\n{}\n\n🔗 立即預訂：\n{url}\n\n監控已自動停止。",
        stay(req)
    )
}

/// Immediate check was already positive; nothing is registered.
pub fn available_now(req: &MonitoringRequest, url: &str) -> String {
    format!(
        "🎉 好消息！房間現在就有空！\n\n{}\n\n🔗 立即預訂：\n{url}\n\n✨ 趕快下訂吧！",
        stay(req)
    )
}

pub fn monitoring_started(req: &MonitoringRequest, interval: Duration) -> String {
    format!(
        "❌ 目前沒有空房，但別擔心！\n\n{}\n\n🔍 已開始自動監控\n⏰ {}檢查一次\n📱 一有空房就立即通知您\n\n輸入「狀態」查看監控狀態\n輸入「停止」取消監控",
        stay(req),
        every(interval)
    )
}

pub fn initial_check_failed(req: &MonitoringRequest, error: &str, interval: Duration) -> String {
    format!(
        "⚠️ 初次查詢失敗：{error}\n\n{}\n\n🔍 仍已開始自動監控\n⏰ {}檢查一次\n\n輸入「停止」取消監控",
        stay(req),
        every(interval)
    )
}

pub fn already_watching(req: &MonitoringRequest) -> String {
    format!("ℹ️ 已在監控相同的條件\n\n{}", stay(req))
}

pub fn status(active: &[MonitoringRequest], interval: Duration) -> String {
    if active.is_empty() {
        return NO_ACTIVE.to_string();
    }
    let mut out = format!("📊 監控狀態：運行中（{} 項）", active.len());
    for req in active {
        let _ = write!(out, "\n\n{}", stay(req));
    }
    let _ = write!(out, "\n\n⏰ {}檢查一次\n💡 輸入「停止」可取消監控", every(interval));
    out
}

pub fn stopped(count: usize) -> String {
    if count == 0 {
        NO_ACTIVE.to_string()
    } else {
        format!("✅ 監控已停止（{count} 項）")
    }
}

pub fn invalid_input(reason: &str) -> String {
    format!(
        "❌ 輸入格式錯誤\n\n正確格式：\n[網址] 入住日期 退房日期 [人數]\n\n範例：\n2025-12-25 2025-12-27 2\n\n錯誤原因：{reason}\n輸入「說明」查看詳細使用方法"
    )
}

pub fn internal_error(reason: &str) -> String {
    format!("發生錯誤：{reason}\n請稍後再試")
}
