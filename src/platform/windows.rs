//! Win32 implementation of the platform traits

#![cfg(target_os = "windows")]

use std::ffi::c_void;

use image::RgbaImage;
use windows::Win32::Foundation::{BOOL, HANDLE, HWND, LPARAM, POINT, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HGDIOBJ,
    SRCCOPY,
};
use windows::Win32::UI::HiDpi::{
    GetDpiForSystem, GetProcessDpiAwareness, SetProcessDpiAwareness,
    PROCESS_PER_MONITOR_DPI_AWARE,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, VK_ESCAPE, VK_LBUTTON};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumChildWindows, EnumWindows, GetCursorPos, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW,
};

use super::{DpiProbe, InputKey, InputProbe, ScreenCapture, WindowHandle, WindowInfo, WindowSystem};
use crate::geometry::{Point, WindowRect};
use crate::{LocatorError, Result};

/// Baseline DPI that corresponds to a scale of 1.0
const BASELINE_DPI: f64 = 96.0;

/// Desktop backed by user32/gdi32/shcore
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Desktop;

impl Win32Desktop {
    pub fn new() -> Self {
        Self
    }
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

fn to_handle(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

fn window_title(hwnd: HWND) -> String {
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return String::new();
    }

    let mut buffer = vec![0u16; len as usize + 1];
    let copied = unsafe { GetWindowTextW(hwnd, &mut buffer) };
    String::from_utf16_lossy(&buffer[..copied.max(0) as usize])
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // lparam points at the Vec owned by the enumerating call below
    let windows = &mut *(lparam.0 as *mut Vec<WindowInfo>);
    windows.push(WindowInfo::new(to_handle(hwnd), window_title(hwnd)));
    BOOL(1)
}

impl WindowSystem for Win32Desktop {
    fn top_level_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut windows: Vec<WindowInfo> = Vec::new();
        unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut windows as *mut Vec<WindowInfo> as isize),
            )
            .map_err(|e| LocatorError::CaptureFailure(format!("EnumWindows: {}", e)))?;
        }
        log::debug!("Enumerated {} top-level windows", windows.len());
        Ok(windows)
    }

    fn descendant_windows(&self, parent: WindowHandle) -> Result<Vec<WindowInfo>> {
        let mut windows: Vec<WindowInfo> = Vec::new();
        unsafe {
            // Returns FALSE both on failure and when there are no children
            let _ = EnumChildWindows(
                to_hwnd(parent),
                Some(collect_window),
                LPARAM(&mut windows as *mut Vec<WindowInfo> as isize),
            );
        }
        log::debug!("Enumerated {} descendants of {:?}", windows.len(), parent);
        Ok(windows)
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<WindowRect> {
        let mut rect = RECT::default();
        unsafe {
            GetWindowRect(to_hwnd(handle), &mut rect)
                .map_err(|e| LocatorError::CaptureFailure(format!("GetWindowRect: {}", e)))?;
        }
        WindowRect::new(rect.left, rect.top, rect.right, rect.bottom)
    }
}

impl ScreenCapture for Win32Desktop {
    fn capture(&self, rect: &WindowRect) -> Result<RgbaImage> {
        let width = rect.width();
        let height = rect.height();
        if width <= 0 || height <= 0 {
            return Err(LocatorError::CaptureFailure(format!(
                "empty capture area {}x{}",
                width, height
            )));
        }

        let mut bgra = vec![0u8; width as usize * height as usize * 4];

        unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.is_invalid() {
                return Err(LocatorError::CaptureFailure("GetDC failed".to_string()));
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
            let previous = SelectObject(mem_dc, HGDIOBJ(bitmap.0));

            let blit = BitBlt(
                mem_dc,
                0,
                0,
                width,
                height,
                screen_dc,
                rect.x(),
                rect.y(),
                SRCCOPY,
            );

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    // Negative height requests a top-down DIB
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let lines = if blit.is_ok() {
                GetDIBits(
                    mem_dc,
                    bitmap,
                    0,
                    height as u32,
                    Some(bgra.as_mut_ptr() as *mut c_void),
                    &mut info,
                    DIB_RGB_COLORS,
                )
            } else {
                0
            };

            SelectObject(mem_dc, previous);
            let _ = DeleteObject(HGDIOBJ(bitmap.0));
            let _ = DeleteDC(mem_dc);
            ReleaseDC(HWND::default(), screen_dc);

            if let Err(e) = blit {
                return Err(LocatorError::CaptureFailure(format!("BitBlt: {}", e)));
            }
            if lines != height {
                return Err(LocatorError::CaptureFailure(format!(
                    "GetDIBits copied {} of {} lines",
                    lines, height
                )));
            }
        }

        for pixel in bgra.chunks_exact_mut(4) {
            pixel.swap(0, 2);
            pixel[3] = 255;
        }

        RgbaImage::from_raw(width as u32, height as u32, bgra)
            .ok_or_else(|| LocatorError::CaptureFailure("capture buffer size mismatch".to_string()))
    }
}

impl DpiProbe for Win32Desktop {
    fn system_scale(&self) -> Result<f64> {
        unsafe {
            let awareness = GetProcessDpiAwareness(HANDLE::default())
                .map_err(|e| LocatorError::DpiQueryFailure(format!("GetProcessDpiAwareness: {}", e)))?;

            if awareness != PROCESS_PER_MONITOR_DPI_AWARE {
                SetProcessDpiAwareness(PROCESS_PER_MONITOR_DPI_AWARE).map_err(|e| {
                    LocatorError::DpiQueryFailure(format!("SetProcessDpiAwareness: {}", e))
                })?;
                log::debug!("Raised process DPI awareness to per-monitor");
            }

            let dpi = GetDpiForSystem();
            if dpi == 0 {
                return Err(LocatorError::DpiQueryFailure(
                    "GetDpiForSystem returned 0".to_string(),
                ));
            }
            Ok(dpi as f64 / BASELINE_DPI)
        }
    }
}

impl InputProbe for Win32Desktop {
    fn cursor_position(&self) -> Result<Point> {
        let mut point = POINT::default();
        unsafe {
            GetCursorPos(&mut point)
                .map_err(|e| LocatorError::CaptureFailure(format!("GetCursorPos: {}", e)))?;
        }
        Ok(Point::new(point.x, point.y))
    }

    fn is_pressed(&self, key: InputKey) -> Result<bool> {
        let vkey = match key {
            InputKey::Confirm => VK_LBUTTON,
            InputKey::Cancel => VK_ESCAPE,
        };
        let state = unsafe { GetAsyncKeyState(vkey.0 as i32) };
        // High bit set while the key is down
        Ok(state < 0)
    }
}
